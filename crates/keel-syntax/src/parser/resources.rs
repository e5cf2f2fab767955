//! Resource bodies: fields, relationships, constraints, hooks and custom
//! constraints.

use super::Parser;
use crate::ast::*;
use crate::error::{ParseError, Span};
use crate::token::{Keyword, Token};
use crate::trivia::join_comments;
use smallvec::SmallVec;

/// `name: type marker`, shared by resource members and inline struct
/// fields.
pub(super) struct MemberHead {
    name: String,
    name_index: usize,
    ty: Type,
    nullable: bool,
    span: Span,
}

struct RawBody {
    text: String,
    span: Span,
    close: Span,
}

impl Parser<'_> {
    pub(super) fn parse_resource(&mut self) -> Option<Resource> {
        let keyword_index = self.index();
        let start = self.bump();
        let (name, _) = self.consume_name("resource name")?;
        self.skip_newlines();
        self.consume(&Token::LeftBrace, "'{' after resource name")?;

        let mut resource = Resource::new(name, start);
        let (documentation, leading_comment) = self.resource_comments(keyword_index);
        resource.documentation = documentation;
        resource.leading_comment = leading_comment;

        loop {
            self.skip_newlines();
            let before = self.index();

            match self.peek() {
                Token::RightBrace => {
                    let end = self.bump();
                    resource.span = start.merge(&end);
                    break;
                }
                Token::Eof => {
                    self.error_expected("'}' to close resource");
                    resource.span = start.merge(&self.previous_span());
                    break;
                }
                // A field may be called `resource`; anything else means the
                // closing brace went missing.
                Token::Keyword(Keyword::Resource) if !matches!(self.peek_nth(1), Token::Colon) => {
                    self.error_expected("'}' to close resource");
                    resource.span = start.merge(&self.previous_span());
                    break;
                }
                Token::At => self.parse_annotation_member(&mut resource),
                _ => self.parse_member(&mut resource),
            }

            if self.index() == before {
                self.bump();
            }
        }

        Some(resource)
    }

    /// Splits the comments above `resource` into `##` documentation and
    /// ordinary comments.
    fn resource_comments(&self, index: usize) -> (Option<String>, Option<String>) {
        let mut docs = Vec::new();
        let mut plain = Vec::new();

        for comment in self.trivia().leading(index) {
            match comment.text.strip_prefix('#') {
                Some(doc) => docs.push(doc.strip_prefix(' ').unwrap_or(doc)),
                None => plain.push(comment),
            }
        }

        let documentation = if docs.is_empty() {
            None
        } else {
            Some(docs.join("\n"))
        };
        (documentation, join_comments(plain))
    }

    fn parse_member(&mut self, resource: &mut Resource) {
        let Some(head) = self.parse_member_head() else {
            self.synchronize_member();
            return;
        };

        let target = match &head.ty {
            Type::ResourceRef(target, _) => Some(target.clone()),
            _ => None,
        };

        match target {
            Some(target) => {
                let relationship = self.finish_relationship(head, target);
                resource.add_relationship(relationship);
            }
            None => {
                let field = self.finish_field(head);
                resource.add_field(field);
            }
        }

        if !matches!(self.peek(), Token::Newline | Token::RightBrace | Token::Eof) {
            self.error_expected("end of line after member");
            self.skip_to_line_end();
        }
    }

    pub(super) fn parse_member_head(&mut self) -> Option<MemberHead> {
        let name_index = self.index();
        let (name, name_span) = self.consume_name("field name")?;
        self.consume(&Token::Colon, "':' after field name")?;
        let ty = self.parse_type()?;

        let glued_marker =
            ty.is_resource_ref() && self.previous().is_some_and(|t| t.lexeme.ends_with('?'));

        let marker = if glued_marker {
            Some(Token::Question)
        } else {
            self.match_any(&[Token::Question, Token::Bang]).map(|t| t.token)
        };

        let nullable = match marker {
            Some(Token::Question) => true,
            Some(_) => false,
            None => {
                let span = self.previous_span();
                self.error(ParseError::MissingNullability {
                    field: name.clone(),
                    span,
                });
                false
            }
        };

        Some(MemberHead {
            name,
            name_index,
            ty,
            nullable,
            span: name_span.merge(&self.previous_span()),
        })
    }

    pub(super) fn finish_field(&mut self, head: MemberHead) -> Field {
        let mut field = Field::new(head.name, head.ty, head.nullable, head.span);

        while self.check(&Token::At) {
            match self.parse_constraint() {
                Some(constraint) => field.add_constraint(constraint),
                None => self.skip_constraint(),
            }
        }

        field.span = field.span.merge(&self.previous_span());
        field.leading_comment = join_comments(self.trivia().leading(head.name_index));
        field.trailing_comment = self.trailing_comment();
        field
    }

    fn finish_relationship(&mut self, head: MemberHead, target: String) -> Relationship {
        let mut relationship = Relationship {
            name: head.name,
            target,
            nullable: head.nullable,
            foreign_key: None,
            on_delete: None,
            on_update: None,
            leading_comment: join_comments(self.trivia().leading(head.name_index)),
            trailing_comment: None,
            span: head.span,
        };

        if self.check(&Token::LeftBrace) {
            self.parse_relationship_options(&mut relationship);
        }

        relationship.span = relationship.span.merge(&self.previous_span());
        relationship.trailing_comment = self.trailing_comment();
        relationship
    }

    fn trailing_comment(&self) -> Option<String> {
        let last = self.index().checked_sub(1)?;
        join_comments(self.trivia().trailing(last))
    }

    /// `{ foreign_key: "...", on_delete: cascade, on_update: restrict }`
    fn parse_relationship_options(&mut self, relationship: &mut Relationship) {
        self.bump();

        loop {
            self.skip_newlines();
            match self.peek() {
                Token::RightBrace => {
                    self.bump();
                    break;
                }
                Token::Eof => {
                    self.error_expected("'}' to close relationship options");
                    break;
                }
                _ => {}
            }

            let before = self.index();
            if !self.parse_relationship_option(relationship) {
                self.skip_option();
            } else if self.eat(&Token::Comma).is_none()
                && !matches!(self.peek(), Token::Newline | Token::RightBrace)
            {
                self.error_expected("',' or newline between relationship options");
                self.skip_option();
            }

            if self.index() == before {
                self.bump();
            }
        }
    }

    fn parse_relationship_option(&mut self, relationship: &mut Relationship) -> bool {
        let Some((key, key_span)) = self.consume_name("relationship option") else {
            return false;
        };
        if self.consume(&Token::Colon, "':' after relationship option").is_none() {
            return false;
        }

        let slot = match key.as_str() {
            "foreign_key" => Some(&mut relationship.foreign_key),
            "on_delete" => Some(&mut relationship.on_delete),
            "on_update" => Some(&mut relationship.on_update),
            _ => None,
        };

        let Some(slot) = slot else {
            self.error(ParseError::UnknownMetadataKey {
                key,
                span: key_span,
            });
            if !matches!(
                self.peek(),
                Token::Comma | Token::Newline | Token::RightBrace | Token::Eof
            ) {
                self.bump();
            }
            return true;
        };

        match self.option_value() {
            Some(value) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    fn option_value(&mut self) -> Option<String> {
        if let Token::String(value) = self.peek() {
            let value = value.clone();
            self.bump();
            return Some(value);
        }
        if let Some(name) = self.peek().as_name() {
            let name = name.to_string();
            self.bump();
            return Some(name);
        }
        self.error_expected("relationship option value");
        None
    }

    fn skip_option(&mut self) {
        while !matches!(
            self.peek(),
            Token::Comma | Token::Newline | Token::RightBrace | Token::Eof
        ) {
            self.bump();
        }
        self.eat(&Token::Comma);
    }

    /// `@name` or `@name(literal, ...)`.
    pub(super) fn parse_constraint(&mut self) -> Option<Constraint> {
        let start = self.consume(&Token::At, "'@'")?;
        let (name, name_span) = self.consume_name("constraint name")?;
        let mut args: SmallVec<[Literal; 2]> = SmallVec::new();
        let mut end = name_span;

        if self.eat(&Token::LeftParen).is_some() {
            loop {
                if let Some(close) = self.eat(&Token::RightParen) {
                    end = close;
                    break;
                }

                match self.parse_constraint_argument(&name) {
                    Some(literal) => args.push(literal),
                    None => self.skip_argument(),
                }

                if self.eat(&Token::Comma).is_some() {
                    continue;
                }
                if let Some(close) = self.consume(&Token::RightParen, "')' after constraint arguments") {
                    end = close;
                }
                break;
            }
        }

        Some(Constraint {
            name,
            args,
            span: start.merge(&end),
        })
    }

    fn parse_constraint_argument(&mut self, constraint: &str) -> Option<Literal> {
        let negative = self.check(&Token::Minus)
            && matches!(self.peek_nth(1), Token::Int(_) | Token::Float(_));
        let start = self.current_span();
        if negative {
            self.bump();
        }

        let literal = match self.peek() {
            Token::Int(n) => Some(Literal::Int(if negative { -*n } else { *n })),
            Token::Float(n) => Some(Literal::Float(if negative { -*n } else { *n })),
            Token::String(s) => Some(Literal::String(s.clone())),
            Token::Keyword(Keyword::True) => Some(Literal::Bool(true)),
            Token::Keyword(Keyword::False) => Some(Literal::Bool(false)),
            _ => None,
        };

        match literal {
            Some(literal) => {
                self.bump();
                Some(literal)
            }
            None => {
                let found = self.peek().display_name();
                self.error(ParseError::InvalidConstraintArgument {
                    constraint: constraint.to_string(),
                    found,
                    span: start.merge(&self.current_span()),
                });
                None
            }
        }
    }

    fn skip_argument(&mut self) {
        while !matches!(
            self.peek(),
            Token::Comma | Token::RightParen | Token::Newline | Token::RightBrace | Token::Eof
        ) {
            self.bump();
        }
    }

    fn skip_constraint(&mut self) {
        while !matches!(
            self.peek(),
            Token::At | Token::Comma | Token::Newline | Token::RightBrace | Token::Eof
        ) {
            self.bump();
        }
    }

    /// `@before trigger { ... }`, `@after trigger { ... }` or
    /// `@constraint name { ... }`.
    fn parse_annotation_member(&mut self, resource: &mut Resource) {
        let start = self.bump();

        let kind = match self.peek() {
            Token::Keyword(Keyword::Before) => Some(HookKind::Before),
            Token::Keyword(Keyword::After) => Some(HookKind::After),
            Token::Keyword(Keyword::Constraint) => None,
            _ => {
                self.error_expected("'before', 'after' or 'constraint' after '@'");
                self.synchronize_member();
                return;
            }
        };
        self.bump();

        let expected = if kind.is_some() {
            "hook trigger"
        } else {
            "constraint name"
        };
        let Some((name, _)) = self.consume_name(expected) else {
            self.synchronize_member();
            return;
        };

        let construct = if kind.is_some() { "hook" } else { "constraint" };
        let Some(body) = self.parse_raw_body(construct) else {
            self.synchronize_member();
            return;
        };

        let span = start.merge(&body.close);
        match kind {
            Some(kind) => resource.add_hook(Hook {
                kind,
                trigger: name,
                body: body.text,
                body_span: body.span,
                span,
            }),
            None => resource.add_custom_constraint(CustomConstraint {
                name,
                body: body.text,
                body_span: body.span,
                span,
            }),
        }
    }

    /// Captures the text between a `{` and its matching `}` without parsing
    /// it. Depth is counted on tokens, so braces inside strings and comments
    /// do not count.
    fn parse_raw_body(&mut self, construct: &str) -> Option<RawBody> {
        let open = self.consume(&Token::LeftBrace, "'{' to open body")?;
        let mut depth = 1usize;

        loop {
            match self.peek() {
                Token::Eof => {
                    self.error(ParseError::UnterminatedBody {
                        construct: construct.to_string(),
                        span: open,
                    });
                    return None;
                }
                Token::LeftBrace | Token::InterpolationStart => depth += 1,
                Token::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.bump();
        }

        let close = self.bump();
        let text = self.slice(open.end, close.start).to_string();

        Some(RawBody {
            text,
            span: Span::new(open.line, open.col + 1, open.end, close.start),
            close,
        })
    }
}
