mod expressions;
mod interpolation;
mod resources;
mod statements;
mod types;

pub use expressions::Precedence;

use crate::ast::*;
use crate::error::{Diagnostic, LexError, ParseError, Span};
use crate::lexer::{LexOptions, Lexer};
use crate::token::{Keyword, SpannedToken, Token};
use crate::trivia::TriviaTable;
use std::sync::Arc;
use tracing::{debug, trace};

/// Nesting limit for parsers built with default options. Parsing at this
/// depth must fit on a default 2 MiB thread stack.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest nesting of expressions, types and blocks accepted before the
    /// construct is rejected with [`ParseError::NestingTooDeep`].
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of parsing a whole document. `program` is always present, even
/// when `diagnostics` is not empty.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpressionOutput {
    pub expression: Option<Expression>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockOutput {
    pub statements: Vec<Statement>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Recursive-descent parser for keel documents.
///
/// Grammar rules live in the sibling modules and return `None` when they
/// fail; by then the diagnostic is already recorded and the caller decides
/// how far to skip. Nothing aborts the parse as a whole.
pub struct Parser<'src> {
    source: &'src str,
    base_offset: usize,
    file: Arc<str>,
    tokens: Vec<SpannedToken>,
    trivia: TriviaTable,
    pos: usize,
    options: ParseOptions,
    depth: usize,
    depth_reported: bool,
    /// Open `(`, `[` or `{` groups inside the current expression; newlines
    /// are insignificant while this is non-zero.
    nesting: usize,
    lex_errors: Vec<LexError>,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, file: &str, options: ParseOptions) -> Self {
        Self::at(source, file, Span::new(1, 1, 0, 0), options)
    }

    /// Creates a parser for a fragment that starts at `origin` inside a
    /// larger document, so spans point into that document.
    pub fn at(source: &'src str, file: &str, origin: Span, options: ParseOptions) -> Self {
        let file: Arc<str> = Arc::from(file);
        let output = Lexer::new(source, &file)
            .with_file(Arc::clone(&file))
            .with_options(LexOptions {
                preserve_trivia: true,
            })
            .starting_at(origin.line, origin.col, origin.start)
            .tokenize();
        let (tokens, trivia) = TriviaTable::split(output.tokens);

        Self {
            source,
            base_offset: origin.start,
            file,
            tokens,
            trivia,
            pos: 0,
            options,
            depth: 0,
            depth_reported: false,
            nesting: 0,
            lex_errors: output.errors,
            errors: Vec::new(),
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let start = self.current_span();
        let mut resources = Vec::new();

        self.skip_newlines();
        while !self.is_at_end() {
            if self.check_keyword(Keyword::Resource) {
                match self.parse_resource() {
                    Some(resource) => resources.push(resource),
                    None => self.synchronize(),
                }
            } else {
                self.error_expected("'resource'");
                self.synchronize();
            }
            self.skip_newlines();
        }

        Program {
            resources,
            span: start.merge(&self.current_span()),
        }
    }

    /// Lexical errors first, then syntax errors, each in the order found.
    pub fn finish(self) -> Vec<Diagnostic> {
        let file = self.file;
        self.lex_errors
            .into_iter()
            .map(|e| Diagnostic::lex(Arc::clone(&file), e))
            .chain(
                self.errors
                    .into_iter()
                    .map(|e| Diagnostic::parse(Arc::clone(&file), e)),
            )
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.lex_errors.len() + self.errors.len()
    }

    #[inline]
    pub(super) fn current(&self) -> &SpannedToken {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    #[inline]
    pub(super) fn peek(&self) -> &Token {
        &self.current().token
    }

    #[inline]
    pub(super) fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)].token
    }

    #[inline]
    pub(super) fn current_span(&self) -> Span {
        self.current().span
    }

    pub(super) fn previous(&self) -> Option<&SpannedToken> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    pub(super) fn previous_span(&self) -> Span {
        self.previous().map(|t| t.span).unwrap_or_default()
    }

    #[inline]
    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    /// Moves past the current token and returns a copy of it. The final
    /// `Eof` is never consumed.
    pub(super) fn advance(&mut self) -> SpannedToken {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    /// Like [`Parser::advance`] but only reports where the token was.
    pub(super) fn bump(&mut self) -> Span {
        let span = self.current_span();
        if !self.is_at_end() {
            self.pos += 1;
        }
        span
    }

    #[inline]
    pub(super) fn check(&self, kind: &Token) -> bool {
        self.peek() == kind
    }

    #[inline]
    pub(super) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().keyword() == Some(keyword)
    }

    /// Consumes the current token when it is any of `kinds`.
    pub(super) fn match_any(&mut self, kinds: &[Token]) -> Option<SpannedToken> {
        if kinds.iter().any(|k| self.check(k)) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(super) fn eat(&mut self, kind: &Token) -> Option<Span> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Consumes `kind` or records "expected `expected`" and leaves the cursor
    /// where it is.
    pub(super) fn consume(&mut self, kind: &Token, expected: &str) -> Option<Span> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            self.error_expected(expected);
            None
        }
    }

    /// Accepts an identifier or any keyword spelling as a name.
    pub(super) fn consume_name(&mut self, expected: &str) -> Option<(String, Span)> {
        match self.peek().as_name() {
            Some(name) => {
                let name = name.to_string();
                Some((name, self.bump()))
            }
            None => {
                self.error_expected(expected);
                None
            }
        }
    }

    pub(super) fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.pos += 1;
        }
    }

    /// Skips to the end of the current line without consuming the newline
    /// or a closing brace.
    pub(super) fn skip_to_line_end(&mut self) {
        while !matches!(self.peek(), Token::Newline | Token::RightBrace | Token::Eof) {
            self.pos += 1;
        }
    }

    pub(super) fn error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub(super) fn error_expected(&mut self, expected: &str) {
        let error = {
            let current = self.current();
            if current.token == Token::Eof {
                ParseError::UnexpectedEof {
                    expected: expected.to_string(),
                    span: current.span,
                }
            } else {
                ParseError::UnexpectedToken {
                    expected: expected.to_string(),
                    found: current.token.display_name(),
                    span: current.span,
                }
            }
        };
        self.errors.push(error);
    }

    /// Panic-mode recovery: discards tokens until just after a newline or
    /// right before `resource` or `@`. Always consumes at least one token.
    pub(super) fn synchronize(&mut self) {
        let start = self.pos;
        self.bump();

        while !self.is_at_end() {
            if matches!(self.previous().map(|t| &t.token), Some(Token::Newline)) {
                break;
            }
            if matches!(self.peek(), Token::Keyword(Keyword::Resource) | Token::At) {
                break;
            }
            self.bump();
        }

        trace!(skipped = self.pos - start, line = self.current_span().line, "synchronized");
    }

    /// Recovery inside a resource body. Same boundaries as
    /// [`Parser::synchronize`], plus the body's closing brace, which is left
    /// in place.
    pub(super) fn synchronize_member(&mut self) {
        if self.check(&Token::RightBrace) {
            return;
        }
        let start = self.pos;
        self.bump();

        while !self.is_at_end() {
            if matches!(self.previous().map(|t| &t.token), Some(Token::Newline)) {
                break;
            }
            if matches!(
                self.peek(),
                Token::Keyword(Keyword::Resource) | Token::At | Token::RightBrace
            ) {
                break;
            }
            self.bump();
        }

        trace!(skipped = self.pos - start, line = self.current_span().line, "synchronized member");
    }

    /// Runs `rule` one nesting level deeper, refusing once the configured
    /// maximum depth is reached. Only the first refusal is reported.
    pub(super) fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.depth >= self.options.max_depth {
            if !self.depth_reported {
                self.depth_reported = true;
                let span = self.current_span();
                self.error(ParseError::NestingTooDeep {
                    limit: self.options.max_depth,
                    span,
                });
            }
            return None;
        }

        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    /// Runs `rule` inside a bracketed group where newlines do not end the
    /// expression.
    pub(super) fn grouped<T>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.nesting += 1;
        let result = rule(self);
        self.nesting -= 1;
        result
    }

    /// Runs `rule` with newlines significant again, as inside a statement
    /// block nested in a bracketed expression.
    pub(super) fn ungrouped<T>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let saved = std::mem::replace(&mut self.nesting, 0);
        let result = rule(self);
        self.nesting = saved;
        result
    }

    /// Source text between two byte offsets of the document.
    pub(super) fn slice(&self, start: usize, end: usize) -> &'src str {
        let start = start.saturating_sub(self.base_offset);
        let end = end.saturating_sub(self.base_offset);
        self.source.get(start..end).unwrap_or_default()
    }

    pub(super) fn file(&self) -> &str {
        &self.file
    }

    pub(super) fn options(&self) -> ParseOptions {
        self.options
    }

    pub(super) fn depth(&self) -> usize {
        self.depth
    }

    pub(super) fn trivia(&self) -> &TriviaTable {
        &self.trivia
    }

    pub(super) fn index(&self) -> usize {
        self.pos
    }
}

/// Parses a complete keel document with default options.
pub fn parse_source(source: &str, file: &str) -> ParseOutput {
    parse_source_with(source, file, ParseOptions::default())
}

pub fn parse_source_with(source: &str, file: &str, options: ParseOptions) -> ParseOutput {
    let mut parser = Parser::new(source, file, options);
    let program = parser.parse_program();
    let diagnostics = parser.finish();

    debug!(
        file,
        resources = program.resources.len(),
        diagnostics = diagnostics.len(),
        "parsed source"
    );

    ParseOutput {
        program,
        diagnostics,
    }
}

/// Parses `source` as a single expression. Anything after the expression
/// is reported.
pub fn parse_expression_source(source: &str, file: &str) -> ExpressionOutput {
    let mut parser = Parser::new(source, file, ParseOptions::default());
    parser.skip_newlines();
    let expression = parser.parse_expression();

    if expression.is_some() {
        parser.skip_newlines();
        if !parser.is_at_end() {
            parser.error_expected("end of input");
        }
    }

    ExpressionOutput {
        expression,
        diagnostics: parser.finish(),
    }
}

/// Parses `source` as a sequence of statements, the language of hook and
/// custom constraint bodies.
pub fn parse_block_source(source: &str, file: &str) -> BlockOutput {
    parse_block_at(source, file, Span::new(1, 1, 0, 0))
}

pub(crate) fn parse_block_at(source: &str, file: &str, origin: Span) -> BlockOutput {
    let mut parser = Parser::at(source, file, origin, ParseOptions::default());
    let mut statements = Vec::new();

    loop {
        statements.extend(parser.parse_statement_list());
        if parser.is_at_end() {
            break;
        }
        // A stray closing brace at the top of a body.
        parser.error_expected("statement");
        parser.bump();
    }

    BlockOutput {
        statements,
        diagnostics: parser.finish(),
    }
}
