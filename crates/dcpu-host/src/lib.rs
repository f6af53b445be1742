//! Minimal terminal driver for the DCPU-16 kit: load a binary or `.asm`
//! program, step it, and stop at `BRK`, a fault, or a watched address.
//! There is no display/audio/input adapter wiring here — see
//! `dcpu-devices` for the peripherals themselves and their push APIs.

mod error;
mod session;

pub use error::LoadError;
pub use session::{RunOutcome, Session, StopReason};
