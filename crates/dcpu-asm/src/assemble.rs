use std::collections::HashMap;
use std::path::Path;

use dcpu_core::{Instruction, Mnemonic, Operand, Word};
use dcpu_decoder::encode_instruction;

use crate::data::parse_data_value;
use crate::error::{AssembleError, AssembleErrorKind};
use crate::line::{self, LineBody, ParsedLine};
use crate::operand::parse_operand_syntax;
use crate::source::{self, SourceLine};

/// Assemble a `.asm` file (and anything it `.include`s) into a word
/// stream, ready to load into [`dcpu_emu::Cpu`] RAM.
pub fn assemble_file(path: impl AsRef<Path>) -> Result<Vec<Word>, AssembleError> {
    let lines = source::expand(path.as_ref())?;
    assemble_lines(&lines)
}

/// Assemble source held in memory. `.include` directives inside it still
/// resolve relative to `base_dir` on disk; `file_label` is used in error
/// messages in place of a real path.
pub fn assemble_source(
    text: &str,
    file_label: &str,
    base_dir: impl AsRef<Path>,
) -> Result<Vec<Word>, AssembleError> {
    let lines = source::expand_str(text, file_label, base_dir.as_ref())?;
    assemble_lines(&lines)
}

fn assemble_lines(source_lines: &[SourceLine]) -> Result<Vec<Word>, AssembleError> {
    let parsed = line::parse_all(source_lines)?;
    let labels = resolve_labels(&parsed)?;
    emit(&parsed, &labels)
}

/// Pass 1+2 combined: walk every logical line once, recording each
/// label's address as it's encountered and advancing a running word
/// counter. Word counts never depend on symbol values (this kit always
/// emits the explicit next-word literal form — see `OperandSyntax`), so
/// this walk never needs the table it's building.
fn resolve_labels(lines: &[ParsedLine]) -> Result<HashMap<String, Word>, AssembleError> {
    let mut labels = HashMap::new();
    let mut pc: Word = 0;

    for line in lines {
        if let Some(name) = &line.label {
            if labels.contains_key(name) {
                return Err(AssembleError::new(
                    &line.file,
                    line.line_no,
                    AssembleErrorKind::DuplicateLabel(name.clone()),
                ));
            }
            labels.insert(name.clone(), pc);
        }
        if let Some(body) = &line.body {
            let count = line_word_count(body).map_err(|kind| AssembleError::new(&line.file, line.line_no, kind))?;
            pc = pc.wrapping_add(count);
        }
    }

    Ok(labels)
}

fn line_word_count(body: &LineBody) -> Result<Word, AssembleErrorKind> {
    match body {
        LineBody::Data { values } => {
            let mut count = 0usize;
            for value in values {
                count += parse_data_value(value)?.len();
            }
            Ok(count as Word)
        }
        LineBody::Instruction { mnemonic, operands } => {
            let mnemonic = Mnemonic::from_text(mnemonic)
                .ok_or_else(|| AssembleErrorKind::UnknownMnemonic(mnemonic.clone()))?;
            let mut count: Word = 1;
            if mnemonic.basic_opcode().is_some() {
                require_operand_count(mnemonic, operands, 2)?;
                for operand in operands {
                    if parse_operand_syntax(operand)?.needs_next_word() {
                        count += 1;
                    }
                }
            } else {
                require_operand_count_at_most(mnemonic, operands, 1)?;
                if let Some(operand) = operands.first() {
                    if parse_operand_syntax(operand)?.needs_next_word() {
                        count += 1;
                    }
                }
            }
            Ok(count)
        }
    }
}

fn require_operand_count(mnemonic: Mnemonic, operands: &[String], expected: usize) -> Result<(), AssembleErrorKind> {
    if operands.len() != expected {
        return Err(AssembleErrorKind::MalformedOperand(format!(
            "`{}` requires {expected} operands, got {}",
            mnemonic.mnemonic_text(),
            operands.len()
        )));
    }
    Ok(())
}

fn require_operand_count_at_most(
    mnemonic: Mnemonic,
    operands: &[String],
    max: usize,
) -> Result<(), AssembleErrorKind> {
    if operands.len() > max {
        return Err(AssembleErrorKind::MalformedOperand(format!(
            "`{}` takes at most {max} operand(s), got {}",
            mnemonic.mnemonic_text(),
            operands.len()
        )));
    }
    Ok(())
}

/// Pass 3: walk the lines again with the now-complete symbol table and
/// emit the actual words.
fn emit(lines: &[ParsedLine], labels: &HashMap<String, Word>) -> Result<Vec<Word>, AssembleError> {
    let mut words = Vec::new();

    for line in lines {
        let Some(body) = &line.body else { continue };
        match body {
            LineBody::Data { values } => {
                for value in values {
                    let parsed = parse_data_value(value).map_err(|k| AssembleError::new(&line.file, line.line_no, k))?;
                    words.extend(parsed.into_words());
                }
            }
            LineBody::Instruction { mnemonic, operands } => {
                let instruction = build_instruction(mnemonic, operands, labels)
                    .map_err(|k| AssembleError::new(&line.file, line.line_no, k))?;
                words.extend(encode_instruction(&instruction));
            }
        }
    }

    Ok(words)
}

/// Build a fully resolved [`Instruction`] for one line. The first written
/// operand is `b` (the destination), the second is `a` (the source),
/// matching the `MNEMONIC b, a` convention; a special-form mnemonic's
/// lone operand is `a`. A special-form mnemonic with no operand written
/// (bare `BRK`) defaults to register `A`, matching how the CPU discards
/// whatever it reads there.
fn build_instruction(
    mnemonic_text: &str,
    operands: &[String],
    labels: &HashMap<String, Word>,
) -> Result<Instruction, AssembleErrorKind> {
    let mnemonic =
        Mnemonic::from_text(mnemonic_text).ok_or_else(|| AssembleErrorKind::UnknownMnemonic(mnemonic_text.to_string()))?;

    if mnemonic.basic_opcode().is_some() {
        require_operand_count(mnemonic, operands, 2)?;
        let (b_code, b_nw) = parse_operand_syntax(&operands[0])?.resolve(labels)?;
        let (a_code, a_nw) = parse_operand_syntax(&operands[1])?.resolve(labels)?;
        Ok(Instruction {
            raw_word: 0,
            mnemonic,
            operand_b: Some(Operand::new(b_code, b_nw)),
            operand_a: Some(Operand::new(a_code, a_nw)),
        })
    } else {
        require_operand_count_at_most(mnemonic, operands, 1)?;
        let (a_code, a_nw) = match operands.first() {
            Some(token) => parse_operand_syntax(token)?.resolve(labels)?,
            None => (0x00, None),
        };
        Ok(Instruction {
            raw_word: 0,
            mnemonic,
            operand_a: Some(Operand::new(a_code, a_nw)),
            operand_b: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpu_decoder::{decode_one, render_instruction};
    use std::path::Path;

    fn assemble(src: &str) -> Vec<Word> {
        assemble_source(src, "test.asm", Path::new(".")).unwrap()
    }

    #[test]
    fn set_literal_into_register() {
        let words = assemble("SET A, 0x30\n");
        assert_eq!(words, vec![0x01 | (0x00 << 5) | (0x1f << 10), 0x30]);
    }

    #[test]
    fn label_resolves_to_its_own_address() {
        let words = assemble(":start SET A, start\nSET B, 2\n");
        // `start` is address 0 (the line it labels)
        assert_eq!(words[1], 0);
    }

    #[test]
    fn forward_reference_resolves_after_full_pass() {
        let words = assemble("SET PC, skip\nSET A, 99\n:skip SET B, 1\n");
        // SET PC, skip (2 words) + SET A, 99 (2 words) puts `skip` at word 4.
        let skip_address = words[1];
        assert_eq!(skip_address, 4);
        let decoded = decode_one(&words, skip_address as usize, false).unwrap();
        assert_eq!(render_instruction(&decoded.instruction), "SET B, 0x0001");
    }

    #[test]
    fn undefined_symbol_is_an_error() {
        let err = assemble_source("SET A, nowhere\n", "test.asm", Path::new(".")).unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::UndefinedSymbol(name) if name == "nowhere"));
        assert_eq!(err.file, "test.asm");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let err = assemble_source(":x SET A, 1\n:x SET B, 2\n", "test.asm", Path::new(".")).unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::DuplicateLabel(_)));
    }

    #[test]
    fn unknown_mnemonic_is_an_error() {
        let err = assemble_source("FOO A, 1\n", "test.asm", Path::new(".")).unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::UnknownMnemonic(_)));
    }

    #[test]
    fn dat_emits_one_word_per_value_and_char() {
        let words = assemble("DAT 1, 0x02, \"AB\"\n");
        assert_eq!(words, vec![1, 2, b'A' as Word, b'B' as Word]);
    }

    #[test]
    fn special_form_with_no_operand_defaults_to_register_a() {
        let words = assemble("BRK\n");
        assert_eq!(words, vec![0x02 << 5]);
    }

    #[test]
    fn jsr_to_label_then_return_round_trips_through_decoder() {
        let words = assemble(":twice SHL A, 1\nSET PC, POP\nSET A, 1\nJSR twice\nBRK\n");
        // last three lines: SET A,1 ; JSR twice ; BRK -- but label `twice` is defined
        // at address 0, so JSR should carry next_word == 0.
        let decoded = decode_one(&words, 0, false).unwrap();
        assert_eq!(decoded.instruction.mnemonic, Mnemonic::Shl);
    }
}
