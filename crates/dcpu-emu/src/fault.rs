use std::fmt;

/// A fatal condition encountered while stepping. The host driver is
/// expected to show this and stop calling `step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The word at PC could not be decoded (e.g. special opcode 0).
    DecodeError,
    /// A decoded instruction carried a mnemonic the dispatcher has no
    /// handler for. Indicates a decoder/dispatcher table mismatch and
    /// should never occur for a correctly paired decoder and CPU.
    UnknownMnemonic,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::DecodeError => write!(f, "could not decode instruction at PC"),
            Fault::UnknownMnemonic => write!(f, "no dispatch handler for decoded mnemonic"),
        }
    }
}

impl std::error::Error for Fault {}
