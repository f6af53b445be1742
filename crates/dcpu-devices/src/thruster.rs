use crate::device::{Device, DeviceCpuView, DeviceKind};

/// Thruster. Sub-function 0 sets power from the low 8 bits of B; anything
/// else is an out-of-range sub-function and is logged and ignored per the
/// device error taxonomy (programs probe devices).
pub struct Thruster {
    pub power: u8,
}

impl Thruster {
    pub fn new() -> Self {
        Self { power: 0 }
    }
}

impl Default for Thruster {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Thruster {
    fn id(&self) -> u32 {
        0xa474_8683
    }
    fn version(&self) -> u16 {
        0x0001
    }
    fn vendor(&self) -> u32 {
        0x5448_2b2b
    }
    fn kind(&self) -> DeviceKind {
        DeviceKind::Thruster
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn handle_interrupt(&mut self, cpu: &mut DeviceCpuView<'_>) {
        use dcpu_core::Register;
        match cpu.get(Register::A) {
            0 => self.power = (cpu.get(Register::B) & 0xff) as u8,
            code => eprintln!("[thruster] unexpected sub-function {code}"),
        }
    }
}
