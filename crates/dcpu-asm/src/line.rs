use crate::error::{AssembleError, AssembleErrorKind};
use crate::source::SourceLine;

/// The body of a logical line once the optional leading label has been
/// split off: either an instruction (mnemonic plus up to two operand
/// tokens, not yet resolved) or a `DAT` directive's raw value tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineBody {
    Instruction {
        mnemonic: String,
        operands: Vec<String>,
    },
    Data {
        values: Vec<String>,
    },
}

/// A source line, fully tokenized but not yet symbol-resolved: the label
/// it defines (if any) and what it emits (if anything — a bare label line
/// defines a symbol without emitting a word itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub file: String,
    pub line_no: usize,
    pub label: Option<String>,
    pub body: Option<LineBody>,
}

pub fn parse_all(lines: &[SourceLine]) -> Result<Vec<ParsedLine>, AssembleError> {
    lines.iter().map(parse_one).collect()
}

fn parse_one(line: &SourceLine) -> Result<ParsedLine, AssembleError> {
    let mut text = line.text.as_str();
    let mut label = None;

    if let Some(rest) = text.strip_prefix(':') {
        let split = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (name, remainder) = rest.split_at(split);
        if name.is_empty() {
            return Err(AssembleError::new(
                &line.file,
                line.line_no,
                AssembleErrorKind::MalformedOperand("empty label name after `:`".to_string()),
            ));
        }
        label = Some(name.to_string());
        text = remainder.trim();
    }

    let body = if text.is_empty() {
        None
    } else {
        Some(parse_body(text, line)?)
    };

    Ok(ParsedLine {
        file: line.file.clone(),
        line_no: line.line_no,
        label,
        body,
    })
}

fn parse_body(text: &str, line: &SourceLine) -> Result<LineBody, AssembleError> {
    let split = text.find(char::is_whitespace).unwrap_or(text.len());
    let (mnemonic, rest) = text.split_at(split);
    let mnemonic = mnemonic.to_ascii_uppercase();
    let operands = split_operands(rest.trim());

    if mnemonic == "DAT" {
        Ok(LineBody::Data { values: operands })
    } else {
        if operands.len() > 2 {
            return Err(AssembleError::new(
                &line.file,
                line.line_no,
                AssembleErrorKind::MalformedOperand(format!(
                    "`{mnemonic}` given {} operands, at most 2 are allowed",
                    operands.len()
                )),
            ));
        }
        Ok(LineBody::Instruction { mnemonic, operands })
    }
}

/// Split on top-level commas, treating text inside a matching pair of
/// quotes or square brackets as opaque so `[A + foo]` and `"a, b"` aren't
/// split apart.
fn split_operands(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;

    for ch in text.chars() {
        match in_quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    in_quote = None;
                }
                continue;
            }
            None => {}
        }
        match ch {
            '"' | '\'' => {
                in_quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> SourceLine {
        SourceLine {
            file: "test.asm".to_string(),
            line_no: 1,
            text: text.to_string(),
        }
    }

    #[test]
    fn label_only_line() {
        let parsed = parse_one(&line(":loop")).unwrap();
        assert_eq!(parsed.label.as_deref(), Some("loop"));
        assert!(parsed.body.is_none());
    }

    #[test]
    fn label_with_instruction_on_same_line() {
        let parsed = parse_one(&line(":start SET A, 1")).unwrap();
        assert_eq!(parsed.label.as_deref(), Some("start"));
        match parsed.body.unwrap() {
            LineBody::Instruction { mnemonic, operands } => {
                assert_eq!(mnemonic, "SET");
                assert_eq!(operands, vec!["A".to_string(), "1".to_string()]);
            }
            LineBody::Data { .. } => panic!("expected instruction"),
        }
    }

    #[test]
    fn splits_operands_respecting_brackets() {
        assert_eq!(
            split_operands("[A + foo], PICK 3"),
            vec!["[A + foo]".to_string(), "PICK 3".to_string()]
        );
    }

    #[test]
    fn dat_with_string_and_comma_inside_is_one_value() {
        let parsed = parse_one(&line(r#"DAT "a, b", 0x10"#)).unwrap();
        match parsed.body.unwrap() {
            LineBody::Data { values } => {
                assert_eq!(values, vec![r#""a, b""#.to_string(), "0x10".to_string()]);
            }
            LineBody::Instruction { .. } => panic!("expected data"),
        }
    }

    #[test]
    fn special_form_single_operand() {
        let parsed = parse_one(&line("JSR helper")).unwrap();
        match parsed.body.unwrap() {
            LineBody::Instruction { mnemonic, operands } => {
                assert_eq!(mnemonic, "JSR");
                assert_eq!(operands, vec!["helper".to_string()]);
            }
            LineBody::Data { .. } => panic!("expected instruction"),
        }
    }

    #[test]
    fn too_many_operands_is_an_error() {
        let err = parse_one(&line("SET A, B, C")).unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::MalformedOperand(_)));
    }
}
