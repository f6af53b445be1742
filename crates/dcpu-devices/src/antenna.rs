use std::collections::VecDeque;

use dcpu_core::{Register, Word};

use crate::device::{Device, DeviceCpuView, DeviceKind};

/// A message sitting in the antenna's receive buffer, supplied by an
/// external adapter via `receive_message`.
pub struct ReceivedMessage {
    pub words: Vec<Word>,
    pub strength: Word,
    pub direction: Word,
}

/// Antenna. Channel is a 32-bit value split across B (high) and C (low)
/// registers. The original devkit packed the channel with `&` where it
/// clearly meant `|` (a channel of all-zero bits after the first set);
/// this kit uses the corrected `|`.
pub struct Antenna {
    channel: u32,
    send_buffer: Vec<Word>,
    recv_buffer: VecDeque<ReceivedMessage>,
    irq_enabled: bool,
    irq_code: Word,
    pending: VecDeque<Word>,
}

impl Antenna {
    pub fn new() -> Self {
        Self {
            channel: 0,
            send_buffer: Vec::new(),
            recv_buffer: VecDeque::new(),
            irq_enabled: false,
            irq_code: 0,
            pending: VecDeque::new(),
        }
    }

    /// Inject a received message from an external adapter; requests an
    /// interrupt if one is configured.
    pub fn receive_message(&mut self, words: Vec<Word>, strength: Word, direction: Word) {
        self.recv_buffer.push_back(ReceivedMessage {
            words,
            strength,
            direction,
        });
        if self.irq_enabled {
            self.pending.push_back(self.irq_code);
        }
    }

    /// Drain whatever this CPU has queued for transmission, for an
    /// external adapter to forward.
    pub fn take_outbound(&mut self) -> Vec<Word> {
        std::mem::take(&mut self.send_buffer)
    }
}

impl Default for Antenna {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Antenna {
    fn id(&self) -> u32 {
        0x74cf_c5a3
    }
    fn version(&self) -> u16 {
        0x0001
    }
    fn vendor(&self) -> u32 {
        0x5448_2b2b
    }
    fn kind(&self) -> DeviceKind {
        DeviceKind::Antenna
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn handle_interrupt(&mut self, cpu: &mut DeviceCpuView<'_>) {
        match cpu.get(Register::A) {
            0 => {
                let message = cpu.get(Register::B);
                self.irq_code = message;
                self.irq_enabled = message != 0;
            }
            1 => {
                let hi = u32::from(cpu.get(Register::B));
                let lo = u32::from(cpu.get(Register::C));
                self.channel = (hi << 16) | lo;
            }
            2 => {
                cpu.set(Register::B, (self.channel >> 16) as Word);
                cpu.set(Register::C, (self.channel & 0xffff) as Word);
            }
            3 => {
                let base = cpu.get(Register::B);
                let count = cpu.get(Register::I).min(256);
                self.send_buffer.clear();
                for offset in 0..count {
                    self.send_buffer.push(cpu.mem.read(base.wrapping_add(offset)));
                }
            }
            4 => match self.recv_buffer.pop_front() {
                Some(msg) => {
                    let base = cpu.get(Register::B);
                    for (i, word) in msg.words.iter().enumerate() {
                        cpu.mem.write(base.wrapping_add(i as Word), *word);
                    }
                    cpu.set(Register::I, msg.words.len() as Word);
                    cpu.set(Register::X, msg.strength);
                    cpu.set(Register::Y, msg.direction);
                }
                None => {
                    cpu.set(Register::I, 0);
                    cpu.set(Register::X, 0);
                    cpu.set(Register::Y, 0);
                }
            },
            5 => self.recv_buffer.clear(),
            code => eprintln!("[antenna] unexpected sub-function {code}"),
        }
    }

    fn poll_interrupt(&mut self) -> Option<Word> {
        self.pending.pop_front()
    }

    fn reset(&mut self) {
        *self = Antenna::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpu_core::{Memory, Registers};

    #[test]
    fn channel_round_trips_with_or_packing() {
        let mut antenna = Antenna::new();
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut view = DeviceCpuView::new(&mut regs, &mut mem);
        view.set(Register::A, 1);
        view.set(Register::B, 0x1234);
        view.set(Register::C, 0x5678);
        antenna.handle_interrupt(&mut view);

        view.set(Register::A, 2);
        antenna.handle_interrupt(&mut view);
        assert_eq!(view.get(Register::B), 0x1234);
        assert_eq!(view.get(Register::C), 0x5678);
    }

    #[test]
    fn empty_receive_zeros_i_x_y() {
        let mut antenna = Antenna::new();
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut view = DeviceCpuView::new(&mut regs, &mut mem);
        view.set(Register::A, 4);
        antenna.handle_interrupt(&mut view);
        assert_eq!(view.get(Register::I), 0);
        assert_eq!(view.get(Register::X), 0);
        assert_eq!(view.get(Register::Y), 0);
    }

    #[test]
    fn received_message_written_into_ram_at_b() {
        let mut antenna = Antenna::new();
        antenna.receive_message(vec![0xaaaa, 0xbbbb], 3, 7);

        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut view = DeviceCpuView::new(&mut regs, &mut mem);
        view.set(Register::B, 0x2000);
        view.set(Register::A, 4);
        antenna.handle_interrupt(&mut view);

        assert_eq!(view.get(Register::I), 2);
        assert_eq!(view.get(Register::X), 3);
        assert_eq!(view.get(Register::Y), 7);
        assert_eq!(view.mem.read(0x2000), 0xaaaa);
        assert_eq!(view.mem.read(0x2001), 0xbbbb);
    }
}
