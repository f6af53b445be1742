use dcpu_core::{Register, Word};

use crate::device::{Device, DeviceCpuView, DeviceKind};

/// One contact in a sensor scan, supplied by an external adapter via
/// `update_sensor`.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub kind: Word,
    pub angle: Word,
    pub range: Word,
    pub size: Word,
}

/// Sensor. Sub-function 0 snapshots the externally-supplied situation
/// into an internal buffer; 1 pops the next contact (LIFO, matching the
/// original devkit's list semantics) into B/X/Y/Z. An empty pop zeros
/// those registers.
pub struct Sensor {
    situation: Vec<Contact>,
    contacts: Vec<Contact>,
}

impl Sensor {
    pub fn new() -> Self {
        Self {
            situation: Vec::new(),
            contacts: Vec::new(),
        }
    }

    /// Replace the externally-observed situation, to be snapshotted on
    /// the next sub-function-0 interrupt.
    pub fn update_sensor(&mut self, contacts: Vec<Contact>) {
        self.situation = contacts;
    }
}

impl Default for Sensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Sensor {
    fn id(&self) -> u32 {
        0x1f12_e306
    }
    fn version(&self) -> u16 {
        0x0001
    }
    fn vendor(&self) -> u32 {
        0x5448_2b2b
    }
    fn kind(&self) -> DeviceKind {
        DeviceKind::Sensor
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn handle_interrupt(&mut self, cpu: &mut DeviceCpuView<'_>) {
        match cpu.get(Register::A) {
            0 => self.contacts = self.situation.clone(),
            1 => match self.contacts.pop() {
                Some(contact) => {
                    cpu.set(Register::B, contact.kind);
                    cpu.set(Register::X, contact.angle);
                    cpu.set(Register::Y, contact.range);
                    cpu.set(Register::Z, contact.size);
                }
                None => {
                    cpu.set(Register::B, 0);
                    cpu.set(Register::X, 0);
                    cpu.set(Register::Y, 0);
                    cpu.set(Register::Z, 0);
                }
            },
            code => eprintln!("[sensor] unexpected sub-function {code}"),
        }
    }

    fn reset(&mut self) {
        self.situation.clear();
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpu_core::{Memory, Registers};

    #[test]
    fn empty_pop_zeros_registers() {
        let mut sensor = Sensor::new();
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut view = DeviceCpuView::new(&mut regs, &mut mem);
        view.set(Register::A, 1);
        sensor.handle_interrupt(&mut view);
        assert_eq!(view.get(Register::B), 0);
        assert_eq!(view.get(Register::Z), 0);
    }

    #[test]
    fn snapshot_then_pop_returns_contact_fields() {
        let mut sensor = Sensor::new();
        sensor.update_sensor(vec![Contact {
            kind: 1,
            angle: 2,
            range: 3,
            size: 4,
        }]);

        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut view = DeviceCpuView::new(&mut regs, &mut mem);
        view.set(Register::A, 0);
        sensor.handle_interrupt(&mut view);
        view.set(Register::A, 1);
        sensor.handle_interrupt(&mut view);

        assert_eq!(view.get(Register::B), 1);
        assert_eq!(view.get(Register::X), 2);
        assert_eq!(view.get(Register::Y), 3);
        assert_eq!(view.get(Register::Z), 4);
    }
}
