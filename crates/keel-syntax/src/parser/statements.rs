//! Statements and statement blocks, the language of hook and custom
//! constraint bodies.

use super::Parser;
use crate::ast::*;
use crate::error::Span;
use crate::token::{Keyword, Token};

impl Parser<'_> {
    /// Parses statements up to a closing brace or end of input, leaving
    /// that token in place. A statement that fails to parse costs exactly
    /// one token before the next attempt.
    pub(super) fn parse_statement_list(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();
            if matches!(self.peek(), Token::RightBrace | Token::Eof) {
                break;
            }

            match self.parse_statement() {
                Some(statement) => {
                    statements.push(statement);
                    if !matches!(self.peek(), Token::Newline | Token::RightBrace | Token::Eof) {
                        self.error_expected("end of statement");
                    }
                }
                None => {
                    if !matches!(self.peek(), Token::RightBrace | Token::Eof) {
                        self.bump();
                    }
                }
            }
        }

        statements
    }

    pub(super) fn parse_statement(&mut self) -> Option<Statement> {
        let start = self.current_span();

        match self.peek() {
            Token::Keyword(Keyword::Let) => {
                self.bump();
                let (name, _) = self.consume_name("variable name after 'let'")?;
                self.consume(&Token::Assign, "'=' in let binding")?;
                self.skip_newlines();
                let value = self.parse_expression()?;
                let span = start.merge(value.span());

                Some(Statement::Let { name, value, span })
            }
            Token::Keyword(Keyword::Return) => {
                self.bump();
                if matches!(self.peek(), Token::Newline | Token::RightBrace | Token::Eof) {
                    return Some(Statement::Return {
                        value: None,
                        span: start,
                    });
                }
                let value = self.parse_expression()?;
                let span = start.merge(value.span());

                Some(Statement::Return {
                    value: Some(value),
                    span,
                })
            }
            Token::Keyword(Keyword::If) => {
                self.bump();
                self.parse_conditional(start, true).map(Statement::If)
            }
            Token::Keyword(Keyword::Unless) => {
                self.bump();
                self.parse_conditional(start, false).map(Statement::Unless)
            }
            _ => self.parse_expression().map(Statement::Expression),
        }
    }

    /// `{ statements }`, returning the statements and the span of the braces.
    pub(super) fn parse_block(&mut self) -> Option<(Vec<Statement>, Span)> {
        let open = self.consume(&Token::LeftBrace, "'{' to open block")?;
        let statements = self.ungrouped(|p| p.nested(|p| Some(p.parse_statement_list())))?;

        let close = match self.eat(&Token::RightBrace) {
            Some(close) => close,
            None => {
                self.error_expected("'}' to close block");
                self.previous_span()
            }
        };

        Some((statements, open.merge(&close)))
    }

    /// The rest of an `if` or `unless` after its keyword, which started at
    /// `start`. `elsif` branches are only accepted after `if`.
    pub(super) fn parse_conditional(&mut self, start: Span, allow_elsif: bool) -> Option<Conditional> {
        let condition = self.parse_expression()?;
        let (then_body, mut end) = self.parse_block()?;
        let mut elsif_branches = Vec::new();
        let mut else_body = None;

        loop {
            let resume = self.pos;
            self.skip_newlines();

            if allow_elsif && self.check_keyword(Keyword::Elsif) {
                let branch_start = self.bump();
                let condition = self.parse_expression()?;
                let (body, body_span) = self.parse_block()?;
                end = body_span;
                elsif_branches.push(ElsifBranch {
                    condition,
                    body,
                    span: branch_start.merge(&body_span),
                });
                continue;
            }

            if self.check_keyword(Keyword::Else) {
                self.bump();
                let (body, body_span) = self.parse_block()?;
                end = body_span;
                else_body = Some(body);
            } else {
                self.pos = resume;
            }
            break;
        }

        Some(Conditional {
            condition,
            then_body,
            elsif_branches,
            else_body,
            span: start.merge(&end),
        })
    }
}
