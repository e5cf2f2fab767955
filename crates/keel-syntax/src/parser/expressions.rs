//! Expression parsing by precedence climbing.

use super::Parser;
use crate::ast::*;
use crate::error::{ParseError, Span};
use crate::token::{Keyword, Token};

/// Binding power of an operator, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Assignment,
    Ternary,
    NullCoalesce,
    Or,
    And,
    Equality,
    Comparison,
    Additive,
    Multiplicative,
    Exponent,
    Unary,
    Postfix,
    Primary,
}

impl Precedence {
    /// Precedence of `token` in infix position, if it is an infix operator.
    pub fn of(token: &Token) -> Option<Precedence> {
        let precedence = match token {
            Token::Assign => Precedence::Assignment,
            Token::Question => Precedence::Ternary,
            Token::QuestionQuestion => Precedence::NullCoalesce,
            Token::Or => Precedence::Or,
            Token::And => Precedence::And,
            Token::Eq | Token::Ne => Precedence::Equality,
            Token::Lt | Token::Le | Token::Gt | Token::Ge => Precedence::Comparison,
            Token::Plus | Token::Minus => Precedence::Additive,
            Token::Star | Token::Slash | Token::Percent => Precedence::Multiplicative,
            Token::StarStar => Precedence::Exponent,
            _ => return None,
        };
        Some(precedence)
    }

    pub fn is_right_associative(self) -> bool {
        matches!(
            self,
            Precedence::Assignment
                | Precedence::Ternary
                | Precedence::NullCoalesce
                | Precedence::Exponent
        )
    }

    fn next(self) -> Precedence {
        match self {
            Precedence::Assignment => Precedence::Ternary,
            Precedence::Ternary => Precedence::NullCoalesce,
            Precedence::NullCoalesce => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Exponent,
            Precedence::Exponent => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix | Precedence::Primary => Precedence::Primary,
        }
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    let op = match token {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Mod,
        Token::StarStar => BinaryOp::Pow,
        Token::Eq => BinaryOp::Eq,
        Token::Ne => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::And => BinaryOp::And,
        Token::Or => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

impl Parser<'_> {
    pub fn parse_expression(&mut self) -> Option<Expression> {
        self.parse_precedence(Precedence::Assignment)
    }

    /// Parses an expression whose operators all bind at least as tightly as
    /// `min`.
    pub(super) fn parse_precedence(&mut self, min: Precedence) -> Option<Expression> {
        self.nested(|p| p.parse_precedence_inner(min))
    }

    fn parse_precedence_inner(&mut self, min: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;

        loop {
            if self.nesting > 0 {
                self.skip_newlines();
            }
            let Some(precedence) = Precedence::of(self.peek()) else {
                break;
            };
            if precedence < min {
                break;
            }

            let before = self.index();
            left = self.parse_infix(left, precedence)?;
            if self.index() == before {
                break;
            }
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };

        let start = self.bump();
        let expr = self.parse_precedence(Precedence::Unary)?;
        let span = start.merge(expr.span());

        Some(Expression::Unary {
            op,
            expr: Box::new(expr),
            span,
        })
    }

    fn parse_infix(&mut self, left: Expression, precedence: Precedence) -> Option<Expression> {
        let operator = self.advance();
        // An operator at the end of a line continues the expression.
        self.skip_newlines();

        match operator.token {
            Token::Assign => {
                if !left.is_assignable() {
                    self.error(ParseError::InvalidAssignmentTarget { span: *left.span() });
                }
                let value = self.parse_precedence(Precedence::Assignment)?;
                let span = left.span().merge(value.span());

                Some(Expression::Assign {
                    target: Box::new(left),
                    value: Box::new(value),
                    span,
                })
            }
            Token::Question => {
                let then_expr = self.parse_precedence(Precedence::Ternary)?;
                if self.nesting > 0 {
                    self.skip_newlines();
                }
                self.consume(&Token::Colon, "':' in ternary expression")?;
                self.skip_newlines();
                let else_expr = self.parse_precedence(Precedence::Ternary)?;
                let span = left.span().merge(else_expr.span());

                Some(Expression::Ternary {
                    condition: Box::new(left),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                    span,
                })
            }
            Token::QuestionQuestion => {
                let right = self.parse_precedence(Precedence::NullCoalesce)?;
                let span = left.span().merge(right.span());

                Some(Expression::NullCoalesce {
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                })
            }
            token => {
                let Some(op) = binary_op(&token) else {
                    self.error(ParseError::InvalidSyntax {
                        message: format!("'{}' is not a binary operator", token),
                        span: operator.span,
                    });
                    return None;
                };

                let operand = if precedence.is_right_associative() {
                    precedence
                } else {
                    precedence.next()
                };
                let right = self.parse_precedence(operand)?;
                let span = left.span().merge(right.span());

                Some(Expression::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                    span,
                })
            }
        }
    }

    fn parse_primary(&mut self) -> Option<Expression> {
        let span = self.current_span();

        match self.peek() {
            Token::Int(n) => {
                let value = Literal::Int(*n);
                self.bump();
                Some(Expression::Literal(value, span))
            }
            Token::Float(n) => {
                let value = Literal::Float(*n);
                self.bump();
                Some(Expression::Literal(value, span))
            }
            Token::String(_) => self.parse_string_literal(),
            Token::Keyword(Keyword::True) => {
                self.bump();
                Some(Expression::Literal(Literal::Bool(true), span))
            }
            Token::Keyword(Keyword::False) => {
                self.bump();
                Some(Expression::Literal(Literal::Bool(false), span))
            }
            Token::Keyword(Keyword::Nil) => {
                self.bump();
                Some(Expression::Nil(span))
            }
            Token::Keyword(Keyword::SelfValue) => {
                self.bump();
                Some(Expression::SelfRef(span))
            }
            Token::Keyword(Keyword::If) => {
                self.bump();
                let conditional = self.parse_conditional(span, true)?;
                Some(Expression::If(Box::new(conditional)))
            }
            Token::Keyword(Keyword::Unless) => {
                self.bump();
                let conditional = self.parse_conditional(span, false)?;
                Some(Expression::Unless(Box::new(conditional)))
            }
            Token::Keyword(Keyword::Match) => self.parse_match(),
            Token::LeftBracket => self.parse_array_literal(),
            Token::LeftBrace => self.parse_hash_literal(),
            Token::LeftParen => self.parse_grouping(),
            Token::Identifier(name) => {
                let name = name.clone();
                if self.at_namespaced_call() {
                    return self.parse_namespaced_call(name, span);
                }
                self.bump();
                Some(Expression::Identifier(name, span))
            }
            Token::Keyword(kw) if kw.is_contextual() => {
                let name = kw.as_str().to_string();
                self.bump();
                Some(Expression::Identifier(name, span))
            }
            _ => {
                self.error_expected("expression");
                None
            }
        }
    }

    /// `namespace.function(` starting at a bare identifier. Longer chains
    /// and `self.` receivers go through the postfix path instead.
    fn at_namespaced_call(&self) -> bool {
        self.peek_nth(1) == &Token::Dot
            && self.peek_nth(2).as_name().is_some()
            && self.peek_nth(3) == &Token::LeftParen
    }

    fn parse_namespaced_call(&mut self, namespace: String, start: Span) -> Option<Expression> {
        self.bump();
        self.bump();
        let (function, _) = self.consume_name("function name")?;
        let (args, close) = self.parse_arguments()?;

        Some(Expression::NamespacedCall {
            namespace,
            function,
            args,
            span: start.merge(&close),
        })
    }

    fn parse_postfix(&mut self, mut expr: Expression) -> Option<Expression> {
        loop {
            expr = match self.peek() {
                Token::LeftParen => {
                    let (args, close) = self.parse_arguments()?;
                    let span = expr.span().merge(&close);

                    match expr {
                        Expression::FieldAccess {
                            receiver, field, ..
                        } => Expression::MethodCall {
                            receiver,
                            method: field,
                            args,
                            span,
                        },
                        callee => Expression::Call {
                            callee: Box::new(callee),
                            args,
                            span,
                        },
                    }
                }
                Token::LeftBracket => {
                    self.bump();
                    let index = self.grouped(|p| {
                        p.skip_newlines();
                        let index = p.parse_expression()?;
                        p.skip_newlines();
                        Some(index)
                    })?;
                    let close = self.consume(&Token::RightBracket, "']' after index")?;
                    let span = expr.span().merge(&close);

                    Expression::Index {
                        receiver: Box::new(expr),
                        index: Box::new(index),
                        span,
                    }
                }
                Token::Dot => {
                    self.bump();
                    let (name, name_span) = self.consume_name("field name after '.'")?;

                    if self.check(&Token::LeftParen) {
                        let (args, close) = self.parse_arguments()?;
                        let span = expr.span().merge(&close);
                        Expression::MethodCall {
                            receiver: Box::new(expr),
                            method: name,
                            args,
                            span,
                        }
                    } else {
                        let span = expr.span().merge(&name_span);
                        Expression::FieldAccess {
                            receiver: Box::new(expr),
                            field: name,
                            span,
                        }
                    }
                }
                Token::QuestionDot => {
                    self.bump();
                    let (name, name_span) = self.consume_name("field name after '?.'")?;
                    let span = expr.span().merge(&name_span);

                    Expression::SafeNavigation {
                        receiver: Box::new(expr),
                        field: name,
                        span,
                    }
                }
                _ => return Some(expr),
            };
        }
    }

    /// `( expr, ... )`, returning the arguments and the closing paren.
    fn parse_arguments(&mut self) -> Option<(Vec<Expression>, Span)> {
        self.consume(&Token::LeftParen, "'('")?;
        self.parse_list(&Token::RightParen, "')'")
    }

    /// Comma-separated expressions up to `close`. Newlines are allowed
    /// anywhere and a trailing comma is tolerated.
    fn parse_list(&mut self, close: &Token, expected: &str) -> Option<(Vec<Expression>, Span)> {
        self.grouped(|p| {
            let mut items = Vec::new();
            loop {
                p.skip_newlines();
                if let Some(end) = p.eat(close) {
                    return Some((items, end));
                }

                items.push(p.parse_expression()?);
                p.skip_newlines();

                if p.eat(&Token::Comma).is_none() {
                    let end = p.consume(close, &format!("',' or {}", expected))?;
                    return Some((items, end));
                }
            }
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let start = self.bump();
        let (elements, close) = self.parse_list(&Token::RightBracket, "']'")?;

        Some(Expression::Array(elements, start.merge(&close)))
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let start = self.bump();

        self.grouped(|p| {
            let mut entries = Vec::new();
            loop {
                p.skip_newlines();
                if let Some(close) = p.eat(&Token::RightBrace) {
                    return Some(Expression::Hash(entries, start.merge(&close)));
                }

                let key = match p.peek() {
                    Token::String(key) => {
                        let key = key.clone();
                        p.bump();
                        key
                    }
                    _ => p.consume_name("hash key")?.0,
                };
                p.consume(&Token::Colon, "':' after hash key")?;
                p.skip_newlines();
                let value = p.parse_expression()?;
                entries.push((key, value));
                p.skip_newlines();

                if p.eat(&Token::Comma).is_none() {
                    let close = p.consume(&Token::RightBrace, "',' or '}'")?;
                    return Some(Expression::Hash(entries, start.merge(&close)));
                }
            }
        })
    }

    fn parse_grouping(&mut self) -> Option<Expression> {
        let start = self.bump();
        let inner = self.grouped(|p| {
            p.skip_newlines();
            let inner = p.parse_expression()?;
            p.skip_newlines();
            Some(inner)
        })?;
        let close = self.consume(&Token::RightParen, "')'")?;

        Some(Expression::Grouping(Box::new(inner), start.merge(&close)))
    }

    /// `match subject { "pattern" => expr, ... }`
    fn parse_match(&mut self) -> Option<Expression> {
        let start = self.bump();
        let subject = self.parse_expression()?;
        self.consume(&Token::LeftBrace, "'{' after match subject")?;

        self.ungrouped(|p| {
            let mut cases = Vec::new();
            loop {
                p.skip_newlines();
                if let Some(close) = p.eat(&Token::RightBrace) {
                    return Some(Expression::Match {
                        subject: Box::new(subject),
                        cases,
                        span: start.merge(&close),
                    });
                }

                let pattern_span = p.current_span();
                let pattern = match p.peek() {
                    Token::String(pattern) => {
                        let pattern = pattern.clone();
                        p.bump();
                        pattern
                    }
                    _ => {
                        p.error_expected("string pattern in match case");
                        return None;
                    }
                };
                p.consume(&Token::FatArrow, "'=>' after match pattern")?;
                p.skip_newlines();
                let value = p.parse_expression()?;

                cases.push(MatchCase {
                    pattern,
                    span: pattern_span.merge(value.span()),
                    value,
                });
                p.eat(&Token::Comma);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn parse(source: &str) -> (Option<Expression>, usize) {
        let mut parser = Parser::new(source, "test.keel", ParseOptions::default());
        let expr = parser.parse_expression();
        (expr, parser.error_count())
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Assignment < Precedence::Ternary);
        assert!(Precedence::Or < Precedence::And);
        assert!(Precedence::Multiplicative < Precedence::Exponent);
        assert!(Precedence::Exponent < Precedence::Unary);
        assert_eq!(Precedence::of(&Token::QuestionQuestion), Some(Precedence::NullCoalesce));
        assert_eq!(Precedence::of(&Token::Colon), None);
    }

    #[test]
    fn test_unary_binds_tighter_than_multiplication() {
        let (expr, errors) = parse("-a * b");

        assert_eq!(errors, 0);
        match expr {
            Some(Expression::Binary { left, op: BinaryOp::Mul, .. }) => {
                assert!(matches!(*left, Expression::Unary { op: UnaryOp::Negate, .. }))
            }
            other => panic!("Expected multiplication, got {:?}", other),
        }
    }

    #[test]
    fn test_newline_ends_expression_outside_groups() {
        let (expr, _) = parse("a\n+ b");
        assert!(matches!(expr, Some(Expression::Identifier(ref n, _)) if n == "a"));

        let (expr, errors) = parse("(a\n+ b)");
        assert_eq!(errors, 0);
        assert!(matches!(expr, Some(Expression::Grouping(..))));
    }

    #[test]
    fn test_operator_at_line_end_continues() {
        let (expr, errors) = parse("a +\n  b");

        assert_eq!(errors, 0);
        assert!(matches!(expr, Some(Expression::Binary { op: BinaryOp::Add, .. })));
    }

    #[test]
    fn test_invalid_assignment_target_is_reported() {
        let (expr, errors) = parse("1 = 2");

        assert_eq!(errors, 1);
        assert!(matches!(expr, Some(Expression::Assign { .. })));
    }

    #[test]
    fn test_expression_depth_is_bounded() {
        let source = format!("{}1{}", "(".repeat(64), ")".repeat(64));
        let mut parser = Parser::new(&source, "test.keel", ParseOptions { max_depth: 16 });

        assert!(parser.parse_expression().is_none());
        assert_eq!(parser.error_count(), 1);
    }
}
