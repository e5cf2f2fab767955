use crate::error::{LexError, Span};
use crate::token::{SpannedToken, Token, lookup_keyword};
use std::sync::Arc;
use tracing::debug;
use unicode_ident::{is_xid_continue, is_xid_start};

#[derive(Debug, Clone, Copy, Default)]
pub struct LexOptions {
    /// Emit `Comment` and `Newline` tokens instead of discarding them.
    pub preserve_trivia: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<SpannedToken>,
    pub errors: Vec<LexError>,
}

/// Scans `source` into tokens, discarding trivia. Never fails: malformed
/// input is reported in [`LexOutput::errors`] and scanning resumes at the
/// next character. The token list always ends with [`Token::Eof`].
pub fn tokenize(source: &str, file: &str) -> LexOutput {
    Lexer::new(source, file).tokenize()
}

pub fn tokenize_with(source: &str, file: &str, options: LexOptions) -> LexOutput {
    Lexer::new(source, file).with_options(options).tokenize()
}

/// Maps the character after a backslash to its escaped value.
pub(crate) fn unescape(ch: char) -> Option<char> {
    match ch {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '\\' => Some('\\'),
        '"' => Some('"'),
        '#' => Some('#'),
        _ => None,
    }
}

#[derive(Clone, Copy)]
struct Mark {
    line: usize,
    col: usize,
    pos: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    file: Arc<str>,
    options: LexOptions,
    pos: usize,
    line: usize,
    col: usize,
    base_offset: usize,
    tokens: Vec<SpannedToken>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: &str) -> Self {
        Self {
            source,
            file: Arc::from(file),
            options: LexOptions::default(),
            pos: 0,
            line: 1,
            col: 1,
            base_offset: 0,
            tokens: Vec::with_capacity(source.len() / 4),
            errors: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: LexOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_file(mut self, file: Arc<str>) -> Self {
        self.file = file;
        self
    }

    /// Positions the scan as if `source` began at the given line, column and
    /// byte offset of an enclosing document.
    pub fn starting_at(mut self, line: usize, col: usize, offset: usize) -> Self {
        self.line = line;
        self.col = col;
        self.base_offset = offset;
        self
    }

    pub fn tokenize(mut self) -> LexOutput {
        while let Some(ch) = self.peek() {
            let start = self.mark();

            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }

                '\n' => {
                    self.bump();
                    if self.options.preserve_trivia {
                        self.push(Token::Newline, start);
                    }
                }

                '#' => {
                    if self.peek_nth(1) == Some('{') {
                        self.bump();
                        self.bump();
                        self.push(Token::InterpolationStart, start);
                    } else {
                        self.scan_comment(start);
                    }
                }

                '"' => self.scan_string(start),

                '0'..='9' => self.scan_number(start),

                _ if is_xid_start(ch) || ch == '_' => self.scan_identifier(start),

                '?' => {
                    self.bump();
                    let token = match self.peek() {
                        Some('.') => {
                            self.bump();
                            Token::QuestionDot
                        }
                        Some('?') => {
                            self.bump();
                            Token::QuestionQuestion
                        }
                        _ => Token::Question,
                    };
                    self.push(token, start);
                }

                '!' => {
                    self.bump();
                    let token = if self.eat('=') { Token::Ne } else { Token::Bang };
                    self.push(token, start);
                }

                '=' => {
                    self.bump();
                    let token = if self.eat('=') {
                        Token::Eq
                    } else if self.eat('>') {
                        Token::FatArrow
                    } else {
                        Token::Assign
                    };
                    self.push(token, start);
                }

                '<' => {
                    self.bump();
                    let token = if self.eat('=') { Token::Le } else { Token::Lt };
                    self.push(token, start);
                }

                '>' => {
                    self.bump();
                    let token = if self.eat('=') { Token::Ge } else { Token::Gt };
                    self.push(token, start);
                }

                '*' => {
                    self.bump();
                    let token = if self.eat('*') { Token::StarStar } else { Token::Star };
                    self.push(token, start);
                }

                '-' => {
                    self.bump();
                    let token = if self.eat('>') { Token::Arrow } else { Token::Minus };
                    self.push(token, start);
                }

                '&' | '|' => {
                    self.bump();
                    if self.eat(ch) {
                        let token = if ch == '&' { Token::And } else { Token::Or };
                        self.push(token, start);
                    } else {
                        self.unexpected(ch, start);
                    }
                }

                '+' => self.single(Token::Plus, start),
                '/' => self.single(Token::Slash, start),
                '%' => self.single(Token::Percent, start),
                '{' => self.single(Token::LeftBrace, start),
                '}' => self.single(Token::RightBrace, start),
                '[' => self.single(Token::LeftBracket, start),
                ']' => self.single(Token::RightBracket, start),
                '(' => self.single(Token::LeftParen, start),
                ')' => self.single(Token::RightParen, start),
                '.' => self.single(Token::Dot, start),
                ',' => self.single(Token::Comma, start),
                ':' => self.single(Token::Colon, start),
                '@' => self.single(Token::At, start),

                _ => {
                    self.bump();
                    self.unexpected(ch, start);
                }
            }
        }

        let end = self.mark();
        self.push(Token::Eof, end);

        debug!(
            file = %self.file,
            tokens = self.tokens.len(),
            errors = self.errors.len(),
            "tokenized source"
        );

        LexOutput {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn scan_comment(&mut self, start: Mark) {
        self.bump();
        let text_start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
        if self.options.preserve_trivia {
            let text = self.source[text_start..self.pos].trim_end_matches('\r').to_string();
            self.push(Token::Comment(text), start);
        }
    }

    fn scan_string(&mut self, start: Mark) {
        self.bump();
        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    self.errors.push(LexError::UnterminatedString {
                        start_line: start.line,
                        span: self.span_from(start),
                    });
                    return;
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(ch) => {
                            self.bump();
                            match unescape(ch) {
                                Some(escaped) => value.push(escaped),
                                None => {
                                    value.push('\\');
                                    value.push(ch);
                                }
                            }
                        }
                        None => {
                            self.errors.push(LexError::UnterminatedString {
                                start_line: start.line,
                                span: self.span_from(start),
                            });
                            return;
                        }
                    }
                }
                Some(ch) => {
                    self.bump();
                    value.push(ch);
                }
            }
        }

        self.push(Token::String(value), start);
    }

    fn scan_number(&mut self, start: Mark) {
        self.eat_digits();

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.eat_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.errors.push(LexError::InvalidExponent {
                    text: self.source[start.pos..self.pos].to_string(),
                    span: self.span_from(start),
                });
                return;
            }
            self.eat_digits();
        }

        let text = &self.source[start.pos..self.pos];
        let cleaned: String = text.chars().filter(|&c| c != '_').collect();

        let token = if is_float {
            cleaned.parse::<f64>().ok().map(Token::Float)
        } else {
            cleaned.parse::<i64>().ok().map(Token::Int)
        };

        match token {
            Some(token) => self.push(token, start),
            None => self.errors.push(LexError::InvalidNumber {
                text: text.to_string(),
                span: self.span_from(start),
            }),
        }
    }

    fn scan_identifier(&mut self, start: Mark) {
        while let Some(ch) = self.peek() {
            if is_xid_continue(ch) {
                self.bump();
            } else {
                break;
            }
        }

        let ident = &self.source[start.pos..self.pos];
        if let Some(keyword) = lookup_keyword(ident) {
            self.push(keyword, start);
            return;
        }

        // Predicate names such as `valid?` keep their `?` unless it opens `?.`.
        if self.peek() == Some('?') && self.peek_nth(1) != Some('.') {
            self.bump();
        }

        let ident = self.source[start.pos..self.pos].to_string();
        self.push(Token::Identifier(ident), start);
    }

    fn eat_digits(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn single(&mut self, token: Token, start: Mark) {
        self.bump();
        self.push(token, start);
    }

    fn unexpected(&mut self, ch: char, start: Mark) {
        self.errors.push(LexError::UnexpectedChar {
            ch,
            span: self.span_from(start),
        });
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            col: self.col,
            pos: self.pos,
        }
    }

    fn span_from(&self, start: Mark) -> Span {
        Span::new(
            start.line,
            start.col,
            self.base_offset + start.pos,
            self.base_offset + self.pos,
        )
    }

    fn push(&mut self, token: Token, start: Mark) {
        let span = self.span_from(start);
        self.tokens.push(SpannedToken {
            token,
            lexeme: self.source[start.pos..self.pos].to_string(),
            span,
            file: Arc::clone(&self.file),
        });
    }
}
