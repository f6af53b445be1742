use crate::device::{Device, DeviceCpuView, DeviceKind};

/// Shared shape for devices the spec names but leaves at a stub level
/// (floppy, laser, boot): no detailed wire protocol, no-op on interrupt.
pub struct StubDevice {
    id: u32,
    version: u16,
    vendor: u32,
    kind: DeviceKind,
}

impl StubDevice {
    pub fn floppy() -> Self {
        Self {
            id: 0x4fd5_24c5,
            version: 0x0001,
            vendor: 0x5448_2b2b,
            kind: DeviceKind::Floppy,
        }
    }

    pub fn laser() -> Self {
        Self {
            id: 0xea63_5459,
            version: 0x0001,
            vendor: 0x5448_2b2b,
            kind: DeviceKind::Laser,
        }
    }

    pub fn boot() -> Self {
        Self {
            id: 0xec41_8001,
            version: 0x0001,
            vendor: 0x5448_2b2b,
            kind: DeviceKind::Boot,
        }
    }
}

impl Device for StubDevice {
    fn id(&self) -> u32 {
        self.id
    }
    fn version(&self) -> u16 {
        self.version
    }
    fn vendor(&self) -> u32 {
        self.vendor
    }
    fn kind(&self) -> DeviceKind {
        self.kind
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn handle_interrupt(&mut self, _cpu: &mut DeviceCpuView<'_>) {
        eprintln!("[{:?}] interrupt raised on unimplemented device, ignoring", self.kind);
    }
}
