//! `#{...}` segments inside string literals.
//!
//! Each segment is lexed and parsed on its own by a fresh parser positioned
//! at the segment's place in the document. Only simple expressions are
//! guaranteed to survive: when the sub-parse fails or leaves tokens behind,
//! the segment degrades to an identifier holding its trimmed text.

use super::Parser;
use crate::ast::*;
use crate::error::Span;
use crate::lexer::unescape;
use crate::token::Token;
use tracing::trace;

impl Parser<'_> {
    pub(super) fn parse_string_literal(&mut self) -> Option<Expression> {
        let token = self.advance();
        let Token::String(value) = token.token else {
            self.error_expected("string literal");
            return None;
        };

        let raw = token.lexeme.strip_prefix('"').unwrap_or(&token.lexeme);
        let raw = raw.strip_suffix('"').unwrap_or(raw);
        if !raw.contains("#{") {
            return Some(Expression::Literal(Literal::String(value), token.span));
        }

        // Contents begin one column and one byte after the opening quote.
        let origin = Span::new(
            token.span.line,
            token.span.col + 1,
            token.span.start + 1,
            token.span.start + 1,
        );
        let parts = self.split_interpolation(raw, origin);

        if parts.iter().all(|part| matches!(part, StringPart::Literal(_))) {
            // Every `#{` was escaped.
            return Some(Expression::Literal(Literal::String(value), token.span));
        }

        Some(Expression::InterpolatedString {
            parts,
            span: token.span,
        })
    }

    fn split_interpolation(&mut self, raw: &str, origin: Span) -> Vec<StringPart> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, escaped)) => match unescape(escaped) {
                        Some(value) => literal.push(value),
                        None => {
                            literal.push('\\');
                            literal.push(escaped);
                        }
                    },
                    None => literal.push('\\'),
                },
                '#' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                    chars.next();
                    let start = index + 2;
                    let mut end = raw.len();
                    let mut depth = 1usize;

                    for (i, c) in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    end = i;
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }

                    if !literal.is_empty() {
                        parts.push(StringPart::Literal(std::mem::take(&mut literal)));
                    }
                    let segment_origin = position_in(raw, origin, start, end);
                    let expression = self.parse_segment(&raw[start..end], segment_origin);
                    parts.push(StringPart::Expression(expression));
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            parts.push(StringPart::Literal(literal));
        }
        parts
    }

    fn parse_segment(&mut self, text: &str, origin: Span) -> Expression {
        let mut sub = Parser::at(text, self.file(), origin, self.options());
        sub.depth = self.depth() + 1;

        sub.skip_newlines();
        let expression = sub.parse_expression();
        sub.skip_newlines();

        match expression {
            Some(expression) if sub.is_at_end() && sub.error_count() == 0 => expression,
            _ => {
                trace!(
                    segment = text,
                    line = origin.line,
                    "interpolation fell back to identifier"
                );
                Expression::Identifier(text.trim().to_string(), origin)
            }
        }
    }
}

/// Document position of `raw[start..end]`, given that `raw` begins at
/// `origin`.
fn position_in(raw: &str, origin: Span, start: usize, end: usize) -> Span {
    let mut line = origin.line;
    let mut col = origin.col;

    for ch in raw[..start].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    Span::new(line, col, origin.start + start, origin.start + end)
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_expression_source;

    fn parse(source: &str) -> Expression {
        let output = parse_expression_source(source, "test.keel");
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        output.expression.unwrap_or_else(|| panic!("no expression for {}", source))
    }

    #[test]
    fn test_plain_string_stays_literal() {
        let expr = parse(r#""hello""#);
        assert!(matches!(expr, Expression::Literal(Literal::String(ref s), _) if s == "hello"));
    }

    #[test]
    fn test_interpolation_parts() {
        match parse(r#""Hi #{user.name}, you have #{count + 1} items""#) {
            Expression::InterpolatedString { parts, .. } => {
                assert_eq!(parts.len(), 5);
                assert_eq!(parts[0], StringPart::Literal("Hi ".to_string()));
                assert!(matches!(
                    &parts[1],
                    StringPart::Expression(Expression::FieldAccess { field, .. }) if field == "name"
                ));
                assert!(matches!(
                    &parts[3],
                    StringPart::Expression(Expression::Binary { op: BinaryOp::Add, .. })
                ));
                assert_eq!(parts[4], StringPart::Literal(" items".to_string()));
            }
            other => panic!("Expected interpolated string, got {:?}", other),
        }
    }

    #[test]
    fn test_escaped_interpolation_is_literal() {
        let expr = parse(r#""price: \#{amount}""#);
        assert!(matches!(expr, Expression::Literal(Literal::String(ref s), _) if s == "price: #{amount}"));
    }

    #[test]
    fn test_segment_spans_point_into_document() {
        let source = r#"  "ab #{total}""#;
        match parse(source) {
            Expression::InterpolatedString { parts, .. } => match &parts[1] {
                StringPart::Expression(Expression::Identifier(name, span)) => {
                    assert_eq!(name, "total");
                    assert_eq!(span.col, 9);
                    assert_eq!(&source[span.start..span.end], "total");
                }
                other => panic!("Expected identifier segment, got {:?}", other),
            },
            other => panic!("Expected interpolated string, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_segment_falls_back_to_identifier() {
        match parse(r##""#{a b}""##) {
            Expression::InterpolatedString { parts, .. } => {
                assert!(matches!(
                    &parts[0],
                    StringPart::Expression(Expression::Identifier(text, _)) if text == "a b"
                ));
            }
            other => panic!("Expected interpolated string, got {:?}", other),
        }
    }
}
