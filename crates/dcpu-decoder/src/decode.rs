use dcpu_core::{Instruction, Mnemonic, Operand, Word};

/// Classification of a word's low bits, independent of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Basic,
    Special,
    /// Only ever produced in disassembly mode.
    Data,
}

impl WordClass {
    /// In disassembly mode a word whose high byte is zero may be an opaque
    /// data word rather than an instruction - there is no way to tell data
    /// from code by inspection alone, so this heuristic only runs when
    /// `disasm` is set. In execution mode every non-zero low field is
    /// treated as an instruction.
    pub fn classify(code: Word, disasm: bool) -> WordClass {
        if disasm && (code & 0xff00) >> 8 == 0 {
            return WordClass::Data;
        }
        if (code & 0x1f) != 0 {
            WordClass::Basic
        } else {
            WordClass::Special
        }
    }
}

/// Result of decoding one instruction starting at a given stream offset.
pub struct Decoded {
    pub instruction: Instruction,
    /// Total words consumed, including the opcode word itself.
    pub consumed: u16,
}

/// Decode a single instruction from `words` starting at `pc`.
///
/// Returns `None` only when `pc` is out of bounds. A truncated instruction
/// at the end of the stream (one that would need a next-word past the end
/// of `words`) is reported as `DAT` carrying its raw word, matching the
/// disassembler's behaviour on an incomplete trailing word.
///
/// In execution mode (`disasm = false`) a special opcode of zero - which
/// would decode to `SPECIAL` with an unrecognized opcode - is a decode
/// failure (`None`), signalling a trap to the caller.
pub fn decode_one(words: &[Word], pc: usize, disasm: bool) -> Option<Decoded> {
    let code = *words.get(pc)?;

    match WordClass::classify(code, disasm) {
        WordClass::Data => Some(Decoded {
            instruction: Instruction::dat(code),
            consumed: 1,
        }),
        WordClass::Basic => {
            let opcode = code & 0x1f;
            let operand_b_code = ((code & 0x3e0) >> 5) as u8;
            let operand_a_code = ((code & 0xfc00) >> 10) as u8;
            let mnemonic = Mnemonic::from_basic_opcode(opcode as u8)?;
            decode_operands(words, pc, mnemonic, code, Some(operand_b_code), operand_a_code, disasm)
        }
        WordClass::Special => {
            let opcode = (code & 0x3e0) >> 5;
            let operand_a_code = ((code & 0xfc00) >> 10) as u8;
            let mnemonic = match Mnemonic::from_special_opcode(opcode as u8) {
                Some(m) => m,
                None if disasm => {
                    return Some(Decoded {
                        instruction: Instruction::dat(code),
                        consumed: 1,
                    })
                }
                None => return None,
            };
            decode_operands(words, pc, mnemonic, code, None, operand_a_code, disasm)
        }
    }
}

/// Fetch operand A's next-word first, then operand B's - the hard ordering
/// invariant shared by execution and disassembly alike.
fn decode_operands(
    words: &[Word],
    pc: usize,
    mnemonic: Mnemonic,
    raw_word: Word,
    operand_b_code: Option<u8>,
    operand_a_code: u8,
    disasm: bool,
) -> Option<Decoded> {
    let mut cursor = pc + 1;
    let mut consumed = 1u16;

    let operand_a = if Operand::code_needs_next_word(operand_a_code) {
        match words.get(cursor) {
            Some(&word) => {
                cursor += 1;
                consumed += 1;
                Some(Operand::new(operand_a_code, Some(word)))
            }
            None if disasm => {
                return Some(Decoded {
                    instruction: Instruction::dat(raw_word),
                    consumed: 1,
                })
            }
            None => return None,
        }
    } else {
        Some(Operand::new(operand_a_code, None))
    };

    let operand_b = match operand_b_code {
        None => None,
        Some(b_code) if Operand::code_needs_next_word(b_code) => match words.get(cursor) {
            Some(&word) => {
                consumed += 1;
                Some(Operand::new(b_code, Some(word)))
            }
            None if disasm => {
                return Some(Decoded {
                    instruction: Instruction::dat(raw_word),
                    consumed: 1,
                })
            }
            None => return None,
        },
        Some(b_code) => Some(Operand::new(b_code, None)),
    };

    Some(Decoded {
        instruction: Instruction {
            raw_word,
            mnemonic,
            operand_a,
            operand_b,
        },
        consumed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_zero_low_bits_as_special() {
        assert_eq!(WordClass::classify(0x0420, false), WordClass::Special);
    }

    #[test]
    fn classify_nonzero_low_bits_as_basic() {
        assert_eq!(WordClass::classify(0x0001, false), WordClass::Basic);
    }

    #[test]
    fn data_heuristic_only_in_disasm_mode() {
        assert_eq!(WordClass::classify(0x0041, true), WordClass::Data);
        assert_eq!(WordClass::classify(0x0041, false), WordClass::Basic);
    }

    #[test]
    fn decodes_set_with_one_literal_next_word() {
        // SET A, 0x30 -> opcode=SET(0x01), b=A(0x00)<<5, a=0x1f<<10
        let code = 0x01 | (0x00 << 5) | (0x1f << 10);
        let words = [code, 0x30];
        let decoded = decode_one(&words, 0, false).unwrap();
        assert_eq!(decoded.consumed, 2);
        assert_eq!(decoded.instruction.mnemonic, Mnemonic::Set);
        assert_eq!(decoded.instruction.operand_a.unwrap().next_word, Some(0x30));
    }

    #[test]
    fn operand_a_next_word_consumed_before_b() {
        // SET [A + nw], nw2  -> b = 0x10 (reg A + next word), a = 0x1f (literal)
        let code = 0x01 | ((0x10u16) << 5) | ((0x1fu16) << 10);
        let words = [code, 0xAAAA, 0xBBBB];
        let decoded = decode_one(&words, 0, false).unwrap();
        assert_eq!(decoded.consumed, 3);
        assert_eq!(decoded.instruction.operand_a.unwrap().next_word, Some(0xAAAA));
        assert_eq!(decoded.instruction.operand_b.unwrap().next_word, Some(0xBBBB));
    }

    #[test]
    fn unrecognized_special_opcode_traps_in_execution_mode() {
        let code = (0x00u16) << 5; // special opcode 0, reserved
        let words = [code];
        assert!(decode_one(&words, 0, false).is_none());
    }

    #[test]
    fn truncated_trailing_instruction_becomes_dat_in_disasm() {
        let code = 0x01 | (0x00 << 5) | (0x1f << 10);
        let words = [code];
        let decoded = decode_one(&words, 0, true).unwrap();
        assert_eq!(decoded.instruction.mnemonic, Mnemonic::Dat);
    }
}
