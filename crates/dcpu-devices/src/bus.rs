//! Device bus: the ordered collection of peripherals `HWN`/`HWQ`/`HWI`
//! address by index.

use dcpu_core::{Memory, Register, Registers, Word};

use crate::device::{Device, DeviceCpuView, DeviceKind};

/// The bus a freshly-built ship carries, in the order the devkit
/// documents: eight thrusters, then boot, display, keyboard, floppy,
/// sensor, clock, sensor, antenna, antenna, docking-clamp, door, laser.
///
/// Bus index is wire-visible (`HWQ` reports it, `HWI` addresses by it), so
/// this order is load-bearing, not cosmetic: a program that assumes
/// thruster 0 is device 0 depends on it.
pub struct DeviceBus {
    devices: Vec<Box<dyn Device>>,
}

impl DeviceBus {
    /// An empty bus, for hosts that want to attach their own device set.
    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// The canonical devkit bus: 8 thrusters, boot, display, keyboard,
    /// floppy, sensor, clock, sensor, antenna, antenna, docking-clamp,
    /// door, laser.
    pub fn standard() -> Self {
        use crate::{
            antenna::Antenna, clock::Clock, display::Lem1802, docking_clamp::DockingClamp,
            door::Door, keyboard::Keyboard, sensor::Sensor, stub::StubDevice, thruster::Thruster,
        };

        let mut bus = Self::empty();
        for _ in 0..8 {
            bus.attach(Box::new(Thruster::new()));
        }
        bus.attach(Box::new(StubDevice::boot()));
        bus.attach(Box::new(Lem1802::new()));
        bus.attach(Box::new(Keyboard::new()));
        bus.attach(Box::new(StubDevice::floppy()));
        bus.attach(Box::new(Sensor::new()));
        bus.attach(Box::new(Clock::new()));
        bus.attach(Box::new(Sensor::new()));
        bus.attach(Box::new(Antenna::new()));
        bus.attach(Box::new(Antenna::new()));
        bus.attach(Box::new(DockingClamp::new()));
        bus.attach(Box::new(Door::new()));
        bus.attach(Box::new(StubDevice::laser()));
        bus
    }

    pub fn attach(&mut self, device: Box<dyn Device>) -> usize {
        self.devices.push(device);
        self.devices.len() - 1
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// `HWN`: device count.
    pub fn count(&self) -> Word {
        self.devices.len() as Word
    }

    /// `HWQ`: id (B:C), version (C... per devkit: B=id_lo? see below), manufacturer (X:Y).
    ///
    /// Layout matches the devkit's documented `HWQ` result: A=id low word,
    /// B=id high word, C=version, X=manufacturer low word, Y=manufacturer
    /// high word.
    pub fn query(&self, index: usize, regs: &mut Registers) {
        let Some(device) = self.devices.get(index) else {
            regs.set(Register::A, 0);
            regs.set(Register::B, 0);
            regs.set(Register::C, 0);
            regs.set(Register::X, 0);
            regs.set(Register::Y, 0);
            return;
        };
        let id = device.id();
        let vendor = device.vendor();
        regs.set(Register::A, (id & 0xffff) as Word);
        regs.set(Register::B, (id >> 16) as Word);
        regs.set(Register::C, device.version());
        regs.set(Register::X, (vendor & 0xffff) as Word);
        regs.set(Register::Y, (vendor >> 16) as Word);
    }

    /// `HWI`: hand off to the device at `index`. A no-op for an
    /// out-of-range index, matching the devkit's documented behavior of
    /// silently ignoring interrupts sent to devices that don't exist.
    pub fn interrupt(&mut self, index: usize, regs: &mut Registers, mem: &mut Memory) {
        if let Some(device) = self.devices.get_mut(index) {
            let mut view = DeviceCpuView::new(regs, mem);
            device.handle_interrupt(&mut view);
        }
    }

    /// Scan devices in bus order for a pending interrupt, once per CPU
    /// step. Returns the bus index and message of the first device with
    /// one queued, matching the "devices are polled in bus order, first
    /// match wins" arbitration the devkit documents for spontaneous
    /// interrupts (keyboard keypress, clock tick, door/clamp state
    /// change, incoming antenna message).
    pub fn poll_pending_irq(&mut self) -> Option<(usize, Word)> {
        for (index, device) in self.devices.iter_mut().enumerate() {
            if let Some(message) = device.poll_interrupt() {
                return Some((index, message));
            }
        }
        None
    }

    /// Find the first attached device of a given kind, for adapters that
    /// need to push external events (key presses, sensor contacts) into a
    /// specific device without tracking its bus index by hand.
    pub fn get_by_kind(&mut self, kind: DeviceKind) -> Option<&mut Box<dyn Device>> {
        self.devices.iter_mut().find(|d| d.kind() == kind)
    }

    /// All attached devices of a given kind, in bus order. Useful for
    /// kinds the standard bus attaches more than once (thruster, sensor,
    /// antenna).
    pub fn get_all_by_kind(&mut self, kind: DeviceKind) -> Vec<&mut Box<dyn Device>> {
        self.devices
            .iter_mut()
            .filter(|d| d.kind() == kind)
            .collect()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Device> {
        self.devices.get(index).map(std::convert::AsRef::as_ref)
    }

    /// Reset every attached device's internal state, as `Cpu::reset`
    /// requires.
    pub fn reset(&mut self) {
        for device in &mut self.devices {
            device.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_bus_has_twenty_devices_in_documented_order() {
        let bus = DeviceBus::standard();
        assert_eq!(bus.count(), 20);
        assert_eq!(bus.get(0).unwrap().kind(), DeviceKind::Thruster);
        assert_eq!(bus.get(7).unwrap().kind(), DeviceKind::Thruster);
        assert_eq!(bus.get(8).unwrap().kind(), DeviceKind::Boot);
        assert_eq!(bus.get(9).unwrap().kind(), DeviceKind::Display);
        assert_eq!(bus.get(10).unwrap().kind(), DeviceKind::Keyboard);
        assert_eq!(bus.get(11).unwrap().kind(), DeviceKind::Floppy);
        assert_eq!(bus.get(12).unwrap().kind(), DeviceKind::Sensor);
        assert_eq!(bus.get(13).unwrap().kind(), DeviceKind::Clock);
        assert_eq!(bus.get(14).unwrap().kind(), DeviceKind::Sensor);
        assert_eq!(bus.get(15).unwrap().kind(), DeviceKind::Antenna);
        assert_eq!(bus.get(16).unwrap().kind(), DeviceKind::Antenna);
        assert_eq!(bus.get(17).unwrap().kind(), DeviceKind::DockingClamp);
        assert_eq!(bus.get(18).unwrap().kind(), DeviceKind::Door);
        assert_eq!(bus.get(19).unwrap().kind(), DeviceKind::Laser);
    }

    #[test]
    fn query_out_of_range_index_zeros_result() {
        let bus = DeviceBus::standard();
        let mut regs = Registers::new();
        bus.query(99, &mut regs);
        assert_eq!(regs.get(Register::A), 0);
        assert_eq!(regs.get(Register::B), 0);
    }

    #[test]
    fn interrupt_to_out_of_range_index_is_a_no_op() {
        let mut bus = DeviceBus::standard();
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        bus.interrupt(99, &mut regs, &mut mem);
    }
}
