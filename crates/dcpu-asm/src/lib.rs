//! Two/three-pass DCPU-16 assembler: source text in, a word stream ready
//! to load into emulator RAM out.
//!
//! Pass 1 expands `.include` directives and strips comments into a flat
//! list of logical lines ([`source`]). Pass 2 tokenizes each line into a
//! label plus a body ([`line`]) and walks them once to build the symbol
//! table, sizing each line without needing that table (word counts never
//! depend on symbol values — see [`operand::OperandSyntax`]). Pass 3 walks
//! the lines again, now symbol-resolved, and emits words by building
//! [`dcpu_core::Instruction`]s and delegating to
//! [`dcpu_decoder::encode_instruction`].

mod assemble;
mod data;
mod error;
mod line;
mod operand;
mod source;

pub use assemble::{assemble_file, assemble_source};
pub use error::{AssembleError, AssembleErrorKind};
pub use source::SourceLine;
