use std::collections::{HashSet, VecDeque};

use dcpu_core::{Register, Word};

use crate::device::{Device, DeviceCpuView, DeviceKind};

/// Generic keyboard. Maintains a FIFO of typed keycodes and a set of
/// currently-pressed keys, fed by the host driver's `handle_key_event`
/// adapter between CPU steps.
pub struct Keyboard {
    buffer: VecDeque<Word>,
    pressed: HashSet<Word>,
    irq_enabled: bool,
    irq_code: Word,
    pending: VecDeque<Word>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            pressed: HashSet::new(),
            irq_enabled: false,
            irq_code: 0,
            pending: VecDeque::new(),
        }
    }

    /// Push a key event from an external adapter. Key-down enqueues the
    /// keycode and marks it pressed; key-up clears the pressed mark only.
    pub fn handle_key_event(&mut self, code: Word, pressed: bool) {
        if pressed {
            self.buffer.push_back(code);
            self.pressed.insert(code);
        } else {
            self.pressed.remove(&code);
        }

        if self.irq_enabled {
            self.pending.push_back(self.irq_code);
        }
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Keyboard {
    fn id(&self) -> u32 {
        0x30cf_7406
    }
    fn version(&self) -> u16 {
        0x0001
    }
    fn vendor(&self) -> u32 {
        0
    }
    fn kind(&self) -> DeviceKind {
        DeviceKind::Keyboard
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn handle_interrupt(&mut self, cpu: &mut DeviceCpuView<'_>) {
        match cpu.get(Register::A) {
            0 => self.buffer.clear(),
            1 => {
                let key = self.buffer.pop_front().unwrap_or(0);
                cpu.set(Register::C, key);
            }
            2 => {
                let key = cpu.get(Register::B);
                cpu.set(Register::C, u16::from(self.pressed.contains(&key)));
            }
            3 => {
                let message = cpu.get(Register::B);
                self.irq_enabled = message != 0;
                self.irq_code = message;
            }
            code => eprintln!("[keyboard] unexpected sub-function {code}"),
        }
    }

    fn poll_interrupt(&mut self) -> Option<Word> {
        self.pending.pop_front()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.pressed.clear();
        self.irq_enabled = false;
        self.irq_code = 0;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpu_core::{Memory, Registers};

    #[test]
    fn dequeues_keys_in_fifo_order() {
        let mut kbd = Keyboard::new();
        kbd.handle_key_event(b'Z' as Word, true);
        kbd.handle_key_event(b'Y' as Word, true);

        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut view = DeviceCpuView::new(&mut regs, &mut mem);
        view.set(Register::A, 1);
        kbd.handle_interrupt(&mut view);
        assert_eq!(view.get(Register::C), b'Z' as Word);
    }

    #[test]
    fn enabling_interrupts_queues_message_on_key_event() {
        let mut kbd = Keyboard::new();
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        {
            let mut view = DeviceCpuView::new(&mut regs, &mut mem);
            view.set(Register::A, 3);
            view.set(Register::B, 0x42);
            kbd.handle_interrupt(&mut view);
        }
        kbd.handle_key_event(b'Z' as Word, true);
        assert_eq!(kbd.poll_interrupt(), Some(0x42));
        assert_eq!(kbd.poll_interrupt(), None);
    }
}
