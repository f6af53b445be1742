use std::fmt;

/// An error raised while translating source into a word stream. Every
/// variant carries the file and line it was found on, the way the
/// original devkit's `TranslationError` does, so the host driver can show
/// `FILE: ... LINE: ...` without re-deriving position from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    pub file: String,
    pub line: usize,
    pub kind: AssembleErrorKind,
}

impl AssembleError {
    pub fn new(file: impl Into<String>, line: usize, kind: AssembleErrorKind) -> Self {
        Self {
            file: file.into(),
            line,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleErrorKind {
    /// A label was referenced but never defined anywhere in the
    /// translation unit (including includes).
    UndefinedSymbol(String),
    /// The first token of an instruction line isn't a recognized
    /// mnemonic.
    UnknownMnemonic(String),
    /// An operand didn't match any of the recognized syntax forms, or an
    /// instruction was given the wrong number of operands for its form.
    MalformedOperand(String),
    /// A label was defined more than once.
    DuplicateLabel(String),
    /// `.include` nested deeper than the bounded-depth cap, almost
    /// certainly an include cycle.
    IncludeDepthExceeded,
    /// `.include` formed a cycle back to a file already being expanded.
    IncludeCycle(String),
    /// The source file (or an included file) could not be read.
    Io(String),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.kind)
    }
}

impl fmt::Display for AssembleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleErrorKind::UndefinedSymbol(name) => write!(f, "undefined symbol `{name}`"),
            AssembleErrorKind::UnknownMnemonic(text) => write!(f, "unknown mnemonic `{text}`"),
            AssembleErrorKind::MalformedOperand(text) => write!(f, "malformed operand: {text}"),
            AssembleErrorKind::DuplicateLabel(name) => write!(f, "label `{name}` defined more than once"),
            AssembleErrorKind::IncludeDepthExceeded => {
                write!(f, ".include nesting exceeded the depth cap (likely a cycle)")
            }
            AssembleErrorKind::IncludeCycle(file) => write!(f, ".include cycle back to `{file}`"),
            AssembleErrorKind::Io(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for AssembleError {}
