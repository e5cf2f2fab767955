//! # Keel Syntax
//!
//! Lexer, parser, and syntax tree definitions for the keel resource language.
//!
//! ## Overview
//!
//! - **Lexer**: scans source into spanned tokens, optionally keeping comments and newlines
//! - **Parser**: recursive descent for resources and types, precedence climbing for expressions
//! - **AST**: resources, fields, relationships, constraints, hooks and the expression tree
//! - **Diagnostics**: every lexical and syntax error with file, line and column
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     ↓
//! Lexer (trivia mode)
//!     ↓
//! Vec<SpannedToken> ──→ TriviaTable (comment attachment)
//!     ↓
//! Parser (parse_source)
//!     ↓
//! Program + Vec<Diagnostic>
//! ```
//!
//! Parsing never stops at the first error. The returned program holds
//! everything that could be recovered and the diagnostics list holds every
//! problem found along the way.
//!
//! ## Example
//!
//! ```rust
//! use keel_syntax::{Literal, Type, parse_source};
//!
//! let source = "resource User {\n  id: uuid! @primary @auto\n  username: string! @min(3)\n}";
//! let output = parse_source(source, "user.keel");
//!
//! assert!(output.diagnostics.is_empty());
//!
//! let user = output.program.resource("User").unwrap();
//! let username = user.field("username").unwrap();
//! assert!(matches!(username.ty, Type::Primitive(ref name, _) if name == "string"));
//! assert_eq!(username.constraint("min").unwrap().args[0], Literal::Int(3));
//! ```
//!
//! ## Grammar Overview
//!
//! ```text
//! Resource:   resource Name { Member* }
//! Member:     name: Type (! | ?) Constraint*
//!             name: ResourceRef (! | ?) { foreign_key: "..", on_delete: .., on_update: .. }?
//!             @before trigger { raw } | @after trigger { raw } | @constraint name { raw }
//! Type:       primitive | array<Type> | hash<Type, Type> | enum["a", ..] | { Member+ } | Name
//! Constraint: @name | @name(literal, ..)
//!
//! Expression: literals, identifiers, self, unary and binary operators, ternary,
//!             ??, assignment, calls, Namespace.fn(..), .field, ?.field, [index],
//!             arrays, hashes, "#{interpolation}", match, if/unless
//! Statement:  let name = expr | return expr? | if .. elsif .. else | unless | expr
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod trivia;

pub use ast::*;
pub use error::{Diagnostic, DiagnosticError, LexError, ParseError, Span};
pub use lexer::{LexOptions, LexOutput, tokenize, tokenize_with};
pub use parser::{
    BlockOutput, ExpressionOutput, ParseOptions, ParseOutput, Parser, parse_block_source,
    parse_expression_source, parse_source, parse_source_with,
};
pub use token::{Keyword, KeywordCategory, SpannedToken, Token};
pub use trivia::{Comment, TriviaTable};
