use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AssembleError, AssembleErrorKind};

/// `.include` nesting is bounded instead of followed forever; the Python
/// original has no such cap and will recurse until the interpreter stack
/// overflows on a cycle.
const MAX_INCLUDE_DEPTH: usize = 16;

/// One logical line of source after comment-stripping and include
/// expansion, still carrying the file and line number it physically came
/// from for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub file: String,
    pub line_no: usize,
    pub text: String,
}

/// Flatten `entry_path` and every file it `.include`s (recursively) into a
/// single ordered list of logical lines, in the order the `.include`
/// directives splice them in: a file's lines up to the directive, then
/// the included file's lines in full, then the rest of the original file.
pub fn expand(entry_path: &Path) -> Result<Vec<SourceLine>, AssembleError> {
    let mut active = HashSet::new();
    let mut out = Vec::new();
    expand_file(entry_path, &mut active, 0, &mut out)?;
    Ok(out)
}

/// Same as [`expand`], but the entry "file" is in-memory source text
/// rather than something read from disk. Used by tests and by callers
/// that already have source loaded (e.g. an embedded program). `.include`
/// directives inside `source` still resolve against `base_dir` on disk.
pub fn expand_str(
    source: &str,
    file_label: &str,
    base_dir: &Path,
) -> Result<Vec<SourceLine>, AssembleError> {
    let mut out = Vec::new();
    push_lines(source, file_label, base_dir, &mut HashSet::new(), 0, &mut out)?;
    Ok(out)
}

fn expand_file(
    path: &Path,
    active: &mut HashSet<PathBuf>,
    depth: usize,
    out: &mut Vec<SourceLine>,
) -> Result<(), AssembleError> {
    let file_label = path.display().to_string();
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if active.contains(&canonical) {
        return Err(AssembleError::new(
            file_label,
            0,
            AssembleErrorKind::IncludeCycle(file_label.clone()),
        ));
    }
    if depth > MAX_INCLUDE_DEPTH {
        return Err(AssembleError::new(
            file_label,
            0,
            AssembleErrorKind::IncludeDepthExceeded,
        ));
    }

    let source = fs::read_to_string(path).map_err(|e| {
        AssembleError::new(
            file_label.clone(),
            0,
            AssembleErrorKind::Io(format!("could not read `{file_label}`: {e}")),
        )
    })?;

    active.insert(canonical.clone());
    let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let result = push_lines(&source, &file_label, &base_dir, active, depth, out);
    active.remove(&canonical);
    result
}

fn push_lines(
    source: &str,
    file_label: &str,
    base_dir: &Path,
    active: &mut HashSet<PathBuf>,
    depth: usize,
    out: &mut Vec<SourceLine>,
) -> Result<(), AssembleError> {
    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let stripped = strip_comment(raw_line).trim();
        if stripped.is_empty() {
            continue;
        }

        if let Some(rest) = stripped.strip_prefix(".include") {
            let include_path = parse_include_path(rest).ok_or_else(|| {
                AssembleError::new(
                    file_label,
                    line_no,
                    AssembleErrorKind::MalformedOperand(format!(
                        ".include expects a quoted path, got `{rest}`"
                    )),
                )
            })?;
            let resolved = base_dir.join(include_path);
            expand_file(&resolved, active, depth + 1, out)?;
            continue;
        }

        out.push(SourceLine {
            file: file_label.to_string(),
            line_no,
            text: stripped.to_string(),
        });
    }
    Ok(())
}

/// Strip a `;`-to-end-of-line comment, respecting quoted strings so a
/// `;` inside `DAT "a;b"` isn't mistaken for one.
fn strip_comment(line: &str) -> &str {
    let mut in_quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match in_quote {
            Some(q) if ch == q => in_quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => in_quote = Some(ch),
            None if ch == ';' => return &line[..i],
            None => {}
        }
    }
    line
}

fn parse_include_path(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let rest = rest.strip_prefix('"').or_else(|| rest.strip_prefix('\''))?;
    let end = rest.find(['"', '\''])?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn strips_trailing_comments() {
        assert_eq!(strip_comment("SET A, 1 ; set A"), "SET A, 1 ");
    }

    #[test]
    fn comment_marker_inside_string_is_preserved() {
        assert_eq!(strip_comment(r#"DAT "a;b""#), r#"DAT "a;b""#);
    }

    #[test]
    fn parses_quoted_include_path() {
        assert_eq!(parse_include_path(r#" "lib.asm""#), Some("lib.asm"));
    }

    #[test]
    fn expand_splices_included_file_in_place() {
        let dir = std::env::temp_dir().join(format!("dcpu-asm-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let lib_path = dir.join("lib.asm");
        let main_path = dir.join("main.asm");
        fs::write(&lib_path, ":helper\nSET PC, POP\n").unwrap();
        let mut main_file = fs::File::create(&main_path).unwrap();
        writeln!(main_file, ".include \"lib.asm\"").unwrap();
        writeln!(main_file, "JSR helper").unwrap();
        drop(main_file);

        let lines = expand(&main_path).unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec![":helper", "SET PC, POP", "JSR helper"]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn include_cycle_is_rejected() {
        let dir = std::env::temp_dir().join(format!("dcpu-asm-cycle-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let a_path = dir.join("a.asm");
        let b_path = dir.join("b.asm");
        fs::write(&a_path, ".include \"b.asm\"\n").unwrap();
        fs::write(&b_path, ".include \"a.asm\"\n").unwrap();

        let err = expand(&a_path).unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::IncludeCycle(_)));

        fs::remove_dir_all(&dir).ok();
    }
}
