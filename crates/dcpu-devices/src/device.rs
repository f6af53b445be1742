use dcpu_core::{Memory, Register, Registers, Word};

/// Borrowed view of CPU-owned state handed to a device for the duration of
/// a single `HWI` call. Devices never own registers or RAM; they borrow
/// them for exactly as long as `handle_interrupt` runs, then return
/// control to the CPU, per the single-threaded cooperative model.
pub struct DeviceCpuView<'a> {
    pub regs: &'a mut Registers,
    pub mem: &'a mut Memory,
}

impl<'a> DeviceCpuView<'a> {
    pub fn new(regs: &'a mut Registers, mem: &'a mut Memory) -> Self {
        Self { regs, mem }
    }

    pub fn get(&self, reg: Register) -> Word {
        self.regs.get(reg)
    }

    pub fn set(&mut self, reg: Register, value: Word) {
        self.regs.set(reg, value);
    }
}

/// Identifies a device's kind for `get_device_by_type`/`get_all_by_type`
/// adapter lookups. Not part of the wire protocol (that's `id`/`version`/
/// `vendor`) — purely a host-side convenience for wiring adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Thruster,
    Boot,
    Display,
    Keyboard,
    Floppy,
    Sensor,
    Clock,
    Antenna,
    DockingClamp,
    Door,
    Laser,
}

/// Common hardware interface every bus-attached peripheral implements.
///
/// `id`/`version`/`vendor` answer `HWQ`; `handle_interrupt` services `HWI`
/// with access to the CPU's registers and RAM for the duration of the
/// call. `poll_interrupt` is for devices that can spontaneously request a
/// hardware interrupt (keyboard, clock, door, antenna, docking clamp): the
/// CPU's step-time dispatcher calls it on every device each step, in bus
/// order, and dispatches the first `Some` it finds. Devices with no
/// interrupt source (display, sensor, thruster, floppy, laser, boot) use
/// the default `None` implementation.
pub trait Device: std::any::Any {
    fn id(&self) -> u32;
    fn version(&self) -> u16;
    fn vendor(&self) -> u32;
    fn kind(&self) -> DeviceKind;

    fn handle_interrupt(&mut self, cpu: &mut DeviceCpuView<'_>);

    fn poll_interrupt(&mut self) -> Option<Word> {
        None
    }

    /// Clear any accumulated internal state (buffers, queues, armed
    /// interrupts). The default no-op suits devices with nothing to reset;
    /// stateful devices (keyboard, clock, sensor, antenna, door, clamp)
    /// override it.
    fn reset(&mut self) {}

    /// Downcast hook so a host driver can reach a device's own push API
    /// (`Keyboard::handle_key_event`, `Sensor::update_sensor`, ...) after
    /// locating it generically via [`crate::bus::DeviceBus::get_by_kind`].
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
