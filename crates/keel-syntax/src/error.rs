use std::fmt;
use std::sync::Arc;

/// A source region: 1-based line and column of the first character plus
/// the byte range it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(line: usize, col: usize, start: usize, end: usize) -> Self {
        Self { line, col, start, end }
    }

    pub fn single(line: usize, col: usize, offset: usize) -> Self {
        Self { line, col, start: offset, end: offset + 1 }
    }

    pub fn merge(&self, other: &Span) -> Self {
        let (line, col) = if (other.line, other.col) < (self.line, self.col) {
            (other.line, other.col)
        } else {
            (self.line, self.col)
        };
        Self {
            line,
            col,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedChar { ch: char, span: Span },
    UnterminatedString { start_line: usize, span: Span },
    InvalidNumber { text: String, span: Span },
    InvalidExponent { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span, .. } => *span,
            LexError::InvalidNumber { span, .. } => *span,
            LexError::InvalidExponent { span, .. } => *span,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedChar { ch, .. } => {
                write!(f, "unexpected character '{}'", ch)
            }
            LexError::UnterminatedString { start_line, .. } => {
                write!(f, "unterminated string literal starting on line {}", start_line)
            }
            LexError::InvalidNumber { text, .. } => {
                write!(f, "invalid number: '{}'", text)
            }
            LexError::InvalidExponent { text, .. } => {
                write!(f, "malformed exponent in number '{}': expected digits after 'e'", text)
            }
        }
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken { expected: String, found: String, span: Span },
    UnexpectedEof { expected: String, span: Span },
    MissingNullability { field: String, span: Span },
    UnknownMetadataKey { key: String, span: Span },
    InvalidConstraintArgument { constraint: String, found: String, span: Span },
    EmptyEnum { span: Span },
    EmptyStruct { span: Span },
    LowercaseResourceName { name: String, span: Span },
    InvalidAssignmentTarget { span: Span },
    NestingTooDeep { limit: usize, span: Span },
    UnterminatedBody { construct: String, span: Span },
    InvalidSyntax { message: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::UnexpectedEof { span, .. } => *span,
            ParseError::MissingNullability { span, .. } => *span,
            ParseError::UnknownMetadataKey { span, .. } => *span,
            ParseError::InvalidConstraintArgument { span, .. } => *span,
            ParseError::EmptyEnum { span } => *span,
            ParseError::EmptyStruct { span } => *span,
            ParseError::LowercaseResourceName { span, .. } => *span,
            ParseError::InvalidAssignmentTarget { span } => *span,
            ParseError::NestingTooDeep { span, .. } => *span,
            ParseError::UnterminatedBody { span, .. } => *span,
            ParseError::InvalidSyntax { span, .. } => *span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, found, .. } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ParseError::UnexpectedEof { expected, .. } => {
                write!(f, "unexpected end of file, expected {}", expected)
            }
            ParseError::MissingNullability { field, .. } => {
                write!(
                    f,
                    "field '{}' is missing its nullability marker ('!' for required, '?' for nullable)",
                    field
                )
            }
            ParseError::UnknownMetadataKey { key, .. } => {
                write!(
                    f,
                    "unknown relationship option '{}' (expected foreign_key, on_delete or on_update)",
                    key
                )
            }
            ParseError::InvalidConstraintArgument { constraint, found, .. } => {
                write!(
                    f,
                    "invalid argument {} for constraint '@{}': expected a literal",
                    found, constraint
                )
            }
            ParseError::EmptyEnum { .. } => {
                write!(f, "enum must declare at least one value")
            }
            ParseError::EmptyStruct { .. } => {
                write!(f, "inline struct must declare at least one field")
            }
            ParseError::LowercaseResourceName { name, .. } => {
                write!(
                    f,
                    "unknown type '{}': resource names must start with a capital letter",
                    name
                )
            }
            ParseError::InvalidAssignmentTarget { .. } => {
                write!(f, "invalid assignment target")
            }
            ParseError::NestingTooDeep { limit, .. } => {
                write!(f, "nesting exceeds the maximum depth of {}", limit)
            }
            ParseError::UnterminatedBody { construct, .. } => {
                write!(f, "unterminated {} body: missing closing '}}'", construct)
            }
            ParseError::InvalidSyntax { message, .. } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticError {
    Lex(LexError),
    Parse(ParseError),
}

/// A lexical or syntax error tagged with the file it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub file: Arc<str>,
    pub error: DiagnosticError,
}

impl Diagnostic {
    pub fn lex(file: Arc<str>, error: LexError) -> Self {
        Self { file, error: DiagnosticError::Lex(error) }
    }

    pub fn parse(file: Arc<str>, error: ParseError) -> Self {
        Self { file, error: DiagnosticError::Parse(error) }
    }

    pub fn span(&self) -> Span {
        match &self.error {
            DiagnosticError::Lex(e) => e.span(),
            DiagnosticError::Parse(e) => e.span(),
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }

    pub fn column(&self) -> usize {
        self.span().col
    }

    pub fn message(&self) -> String {
        match &self.error {
            DiagnosticError::Lex(e) => e.to_string(),
            DiagnosticError::Parse(e) => e.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match &self.error {
            DiagnosticError::Lex(_) => "lexical error",
            DiagnosticError::Parse(_) => "parse error",
        }
    }

    pub fn is_lex(&self) -> bool {
        matches!(self.error, DiagnosticError::Lex(_))
    }

    /// Plain-text rendering with a source excerpt; tooling that wants colors
    /// builds its own from [`Diagnostic::span`].
    pub fn render(&self, source: &str) -> String {
        let span = self.span();
        format!(
            "{}: {}\n  in {}:{}:{}\n{}",
            self.label(),
            self.message(),
            self.file,
            span.line,
            span.col,
            excerpt(source, span)
        )
    }
}

/// The line holding `span` and its neighbours, gutter-numbered, with the
/// span underlined. Empty when `span` lies past the end of `source`.
fn excerpt(source: &str, span: Span) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let Some(target) = span.line.checked_sub(1).filter(|&i| i < lines.len()) else {
        return String::new();
    };

    let first = target.saturating_sub(1);
    let last = (target + 1).min(lines.len() - 1);
    let width = (last + 1).to_string().len();
    let mut out = String::new();

    for (i, line) in lines.iter().enumerate().take(last + 1).skip(first) {
        out.push_str(&format!(" {:>width$} | {}\n", i + 1, line));
        if i == target {
            let room = line.chars().count().saturating_sub(span.col.saturating_sub(1));
            let underline = span.end.saturating_sub(span.start).min(room).max(1);
            out.push_str(&format!(
                " {:>width$} | {}{}\n",
                "",
                " ".repeat(span.col.saturating_sub(1)),
                "^".repeat(underline)
            ));
        }
    }

    out
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.span();
        write!(f, "{}:{}:{}: {}", self.file, span.line, span.col, self.message())
    }
}
