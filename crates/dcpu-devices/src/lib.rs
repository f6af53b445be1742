//! Memory-mapped hardware peripherals for the DCPU-16: the `HWN`/`HWQ`/
//! `HWI` protocol (see [`device::Device`]) and the device bus that wires
//! together a standard ship ([`bus::DeviceBus`]).

pub mod antenna;
pub mod bus;
pub mod clock;
pub mod device;
pub mod display;
pub mod docking_clamp;
pub mod door;
pub mod keyboard;
pub mod sensor;
pub mod stub;
pub mod thruster;

pub use antenna::{Antenna, ReceivedMessage};
pub use bus::DeviceBus;
pub use clock::Clock;
pub use device::{Device, DeviceCpuView, DeviceKind};
pub use display::Lem1802;
pub use docking_clamp::DockingClamp;
pub use door::{Door, DoorState};
pub use keyboard::Keyboard;
pub use sensor::{Contact, Sensor};
pub use stub::StubDevice;
pub use thruster::Thruster;
