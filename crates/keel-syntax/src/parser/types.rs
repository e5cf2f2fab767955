//! Type expressions: primitives, `array<T>`, `hash<K, V>`, `enum[...]`,
//! inline structs and resource references.

use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Keyword, Token};

impl Parser<'_> {
    /// Parses one type. On failure nothing partial is returned; the error
    /// is recorded and the cursor sits at the offending token.
    pub(super) fn parse_type(&mut self) -> Option<Type> {
        self.nested(|p| p.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> Option<Type> {
        match self.peek() {
            Token::Keyword(kw) if kw.is_primitive_type() => {
                let name = kw.as_str().to_string();
                let span = self.bump();
                Some(Type::Primitive(name, span))
            }
            Token::Keyword(Keyword::Array) => self.parse_array_type(),
            Token::Keyword(Keyword::Hash) => self.parse_hash_type(),
            Token::Keyword(Keyword::Enum) => self.parse_enum_type(),
            Token::LeftBrace => self.parse_struct_type(),
            Token::Identifier(name) => {
                // `User?` arrives as one identifier; the `?` is the field's
                // nullability marker, not part of the name.
                let name = name.strip_suffix('?').unwrap_or(name.as_str()).to_string();
                let span = self.current_span();

                if name.chars().next().is_some_and(char::is_uppercase) {
                    self.bump();
                    Some(Type::ResourceRef(name, span))
                } else {
                    self.error(ParseError::LowercaseResourceName { name, span });
                    None
                }
            }
            _ => {
                self.error_expected("type");
                None
            }
        }
    }

    fn parse_array_type(&mut self) -> Option<Type> {
        let start = self.bump();
        self.consume(&Token::Lt, "'<' after 'array'")?;
        let element = self.parse_type_argument()?;
        let end = self.consume(&Token::Gt, "'>' to close array type")?;

        Some(Type::Array(Box::new(element), start.merge(&end)))
    }

    fn parse_hash_type(&mut self) -> Option<Type> {
        let start = self.bump();
        self.consume(&Token::Lt, "'<' after 'hash'")?;
        let key = self.parse_type_argument()?;
        self.consume(&Token::Comma, "',' between hash key and value types")?;
        let value = self.parse_type_argument()?;
        let end = self.consume(&Token::Gt, "'>' to close hash type")?;

        Some(Type::Hash {
            key: Box::new(key),
            value: Box::new(value),
            span: start.merge(&end),
        })
    }

    /// A type inside `<...>`. Nullability belongs to the member, so a `?`
    /// glued to a resource name here is reported and dropped.
    fn parse_type_argument(&mut self) -> Option<Type> {
        let ty = self.parse_type()?;

        if ty.is_resource_ref() && self.previous().is_some_and(|t| t.lexeme.ends_with('?')) {
            let span = self.previous_span();
            self.error(ParseError::InvalidSyntax {
                message: "nullability marker '?' is not allowed inside a type argument".to_string(),
                span,
            });
        }

        Some(ty)
    }

    fn parse_enum_type(&mut self) -> Option<Type> {
        let start = self.bump();
        self.consume(&Token::LeftBracket, "'[' after 'enum'")?;

        let mut values = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Token::RightBracket => break,
                Token::String(value) => {
                    values.push(value.clone());
                    self.bump();
                }
                _ => {
                    self.error_expected("string literal enum value");
                    return None;
                }
            }
            self.skip_newlines();
            if self.eat(&Token::Comma).is_none() && !self.check(&Token::RightBracket) {
                // Newline-separated values arrive here with the newline
                // already skipped.
                if !matches!(self.previous().map(|t| &t.token), Some(Token::Newline)) {
                    self.error_expected("',' or ']' in enum");
                    return None;
                }
            }
        }

        let end = self.bump();
        let span = start.merge(&end);
        if values.is_empty() {
            self.error(ParseError::EmptyEnum { span });
            return None;
        }

        Some(Type::Enum(values, span))
    }

    fn parse_struct_type(&mut self) -> Option<Type> {
        let start = self.bump();

        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Token::RightBrace => break,
                Token::Eof => {
                    self.error_expected("'}' to close inline struct");
                    return None;
                }
                _ => {}
            }

            let head = self.parse_member_head()?;
            fields.push(self.finish_field(head));

            if self.eat(&Token::Comma).is_none()
                && !matches!(self.peek(), Token::Newline | Token::RightBrace)
            {
                self.error_expected("',' or newline between struct fields");
                return None;
            }
        }

        let end = self.bump();
        let span = start.merge(&end);
        if fields.is_empty() {
            self.error(ParseError::EmptyStruct { span });
            return None;
        }

        Some(Type::Struct(fields, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn parse_type(source: &str) -> (Option<Type>, usize) {
        let mut parser = Parser::new(source, "test.keel", ParseOptions::default());
        let ty = parser.parse_type();
        (ty, parser.error_count())
    }

    #[test]
    fn test_primitive_type() {
        let (ty, errors) = parse_type("decimal");

        assert_eq!(errors, 0);
        match ty {
            Some(Type::Primitive(name, _)) => assert_eq!(name, "decimal"),
            other => panic!("Expected primitive type, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_array_type() {
        let (ty, errors) = parse_type("array<array<string>>");

        assert_eq!(errors, 0);
        match ty {
            Some(Type::Array(inner, _)) => match *inner {
                Type::Array(element, _) => {
                    assert!(matches!(*element, Type::Primitive(ref n, _) if n == "string"))
                }
                other => panic!("Expected inner array, got {:?}", other),
            },
            other => panic!("Expected array type, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_enum() {
        let (ty, errors) = parse_type("enum[\n  \"draft\"\n  \"published\",\n  \"archived\"\n]");

        assert_eq!(errors, 0);
        match ty {
            Some(Type::Enum(values, _)) => {
                assert_eq!(values, vec!["draft", "published", "archived"])
            }
            other => panic!("Expected enum type, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_enum_is_rejected() {
        let (ty, errors) = parse_type("enum[]");

        assert!(ty.is_none());
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_inline_struct() {
        let (ty, errors) = parse_type("{ street: string!, zip: string? @pattern(\"[0-9]+\") }");

        assert_eq!(errors, 0);
        match ty {
            Some(Type::Struct(fields, _)) => {
                assert_eq!(fields.len(), 2);
                assert!(!fields[0].nullable);
                assert!(fields[1].nullable);
                assert_eq!(fields[1].constraints[0].name, "pattern");
            }
            other => panic!("Expected struct type, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_struct_is_rejected() {
        let (ty, errors) = parse_type("{ }");

        assert!(ty.is_none());
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_resource_reference_strips_predicate_marker() {
        let (ty, errors) = parse_type("Author?");

        assert_eq!(errors, 0);
        assert!(matches!(ty, Some(Type::ResourceRef(ref n, _)) if n == "Author"));
    }

    #[test]
    fn test_marker_inside_type_argument_is_reported() {
        let (ty, errors) = parse_type("array<User?>");

        assert_eq!(errors, 1);
        match ty {
            Some(Type::Array(inner, _)) => {
                assert!(matches!(*inner, Type::ResourceRef(ref n, _) if n == "User"))
            }
            other => panic!("Expected array type, got {:?}", other),
        }

        let (_, errors) = parse_type("hash<string, Author?>");
        assert_eq!(errors, 1);

        let (_, errors) = parse_type("array<User>");
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_lowercase_reference_is_rejected() {
        let (ty, errors) = parse_type("author");

        assert!(ty.is_none());
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_type_depth_is_bounded() {
        let source = format!("{}int{}", "array<".repeat(10), ">".repeat(10));
        let mut parser = Parser::new(&source, "test.keel", ParseOptions { max_depth: 4 });

        assert!(parser.parse_type().is_none());
        assert_eq!(parser.error_count(), 1);
    }
}
