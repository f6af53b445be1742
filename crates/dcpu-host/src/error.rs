use std::fmt;
use std::io;

use dcpu_asm::AssembleError;

/// Anything that can stop a load before emulation starts: a bad binary
/// path, or a source file that failed to assemble.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Assemble(AssembleError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "{err}"),
            LoadError::Assemble(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

impl From<AssembleError> for LoadError {
    fn from(err: AssembleError) -> Self {
        LoadError::Assemble(err)
    }
}
