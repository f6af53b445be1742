//! Decoding a DCPU-16 word stream into structured instructions, and
//! rendering those instructions back to assembly text.

mod decode;
mod disassemble;
mod encode;

pub use decode::{decode_one, Decoded, WordClass};
pub use disassemble::render_instruction;
pub use encode::encode_instruction;

use dcpu_core::{Instruction, Word};

/// Decode an entire word stream into a lazy sequence of `(pc, Instruction)`
/// pairs, in disassembly mode (the `DATA` heuristic is active).
///
/// This is the entry point disassemblers use; the emulator instead calls
/// [`decode_one`] directly against live memory, one instruction at a time,
/// with the heuristic disabled.
pub fn disassemble(words: &[Word]) -> Vec<(Word, Instruction)> {
    let mut out = Vec::new();
    let mut pc: usize = 0;
    while pc < words.len() {
        match decode_one(words, pc, true) {
            Some(Decoded { instruction, consumed }) => {
                out.push((pc as Word, instruction));
                pc += consumed as usize;
            }
            None => break,
        }
    }
    out
}
