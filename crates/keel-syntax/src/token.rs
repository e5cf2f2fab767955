//! Token kinds and the keyword table.

use crate::error::Span;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    Resource,
    Lifecycle,
    Transaction,
    Relationship,
    Annotation,
    ControlFlow,
    Operation,
    Type,
    Query,
    Modifier,
    Literal,
}

macro_rules! keywords {
    ($($category:ident => { $($variant:ident = $text:literal),* $(,)? })*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($($variant,)*)*
        }

        impl Keyword {
            pub const ALL: &'static [Keyword] = &[$($(Keyword::$variant,)*)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($(Keyword::$variant => $text,)*)*
                }
            }

            pub fn category(self) -> KeywordCategory {
                match self {
                    $($(Keyword::$variant => KeywordCategory::$category,)*)*
                }
            }
        }
    };
}

keywords! {
    Resource => {
        Resource = "resource",
        Extends = "extends",
        Abstract = "abstract",
        Mixin = "mixin",
    }
    Lifecycle => {
        Before = "before",
        After = "after",
        Create = "create",
        Update = "update",
        Delete = "delete",
        Save = "save",
        Validate = "validate",
        Destroy = "destroy",
    }
    Transaction => {
        Transaction = "transaction",
        Commit = "commit",
        Rollback = "rollback",
        Atomic = "atomic",
    }
    Relationship => {
        BelongsTo = "belongs_to",
        HasMany = "has_many",
        HasOne = "has_one",
        Through = "through",
        ForeignKey = "foreign_key",
        OnDelete = "on_delete",
        OnUpdate = "on_update",
        Cascade = "cascade",
        Restrict = "restrict",
        SetNull = "set_null",
        NoAction = "no_action",
    }
    Annotation => {
        Constraint = "constraint",
        Primary = "primary",
        Unique = "unique",
        Auto = "auto",
        AutoUpdate = "auto_update",
        Default = "default",
        Required = "required",
        Index = "index",
        Computed = "computed",
        Invariant = "invariant",
    }
    ControlFlow => {
        If = "if",
        Elsif = "elsif",
        Else = "else",
        Unless = "unless",
        Match = "match",
        Let = "let",
        Return = "return",
        For = "for",
        In = "in",
        While = "while",
        Break = "break",
        Continue = "continue",
    }
    Operation => {
        SelfValue = "self",
        New = "new",
        Emit = "emit",
        Raise = "raise",
        Log = "log",
    }
    Type => {
        String = "string",
        Text = "text",
        Int = "int",
        Float = "float",
        Decimal = "decimal",
        Bool = "bool",
        Uuid = "uuid",
        Email = "email",
        Url = "url",
        Phone = "phone",
        Timestamp = "timestamp",
        Date = "date",
        Time = "time",
        Json = "json",
        Bytes = "bytes",
        Markdown = "markdown",
        Money = "money",
        Array = "array",
        Hash = "hash",
        Enum = "enum",
    }
    Query => {
        Where = "where",
        OrderBy = "order_by",
        Limit = "limit",
        Offset = "offset",
        Select = "select",
        Include = "include",
        Count = "count",
        Sum = "sum",
        Avg = "avg",
        GroupBy = "group_by",
        Exists = "exists",
    }
    Modifier => {
        Public = "public",
        Private = "private",
        Readonly = "readonly",
        Deprecated = "deprecated",
        Indexed = "indexed",
        Immutable = "immutable",
        Sensitive = "sensitive",
    }
    Literal => {
        True = "true",
        False = "false",
        Nil = "nil",
    }
}

impl Keyword {
    /// Scalar type keywords that stand on their own in type position.
    pub fn is_primitive_type(self) -> bool {
        self.category() == KeywordCategory::Type
            && !matches!(self, Keyword::Array | Keyword::Hash | Keyword::Enum)
    }

    /// Keywords the expression grammar reads as plain identifiers.
    pub fn is_contextual(self) -> bool {
        !matches!(
            self.category(),
            KeywordCategory::ControlFlow | KeywordCategory::Literal
        ) && self != Keyword::SelfValue
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, Token>> = Lazy::new(|| {
    let mut m = HashMap::with_capacity(Keyword::ALL.len() + 3);
    for &kw in Keyword::ALL {
        m.insert(kw.as_str(), Token::Keyword(kw));
    }
    m.insert("and", Token::And);
    m.insert("or", Token::Or);
    m.insert("not", Token::Bang);
    m
});

pub fn lookup_keyword(ident: &str) -> Option<Token> {
    KEYWORDS.get(ident).cloned()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),
    Int(i64),
    Float(f64),
    String(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Bang,
    Assign,
    Arrow,
    FatArrow,
    Question,
    QuestionDot,
    QuestionQuestion,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Dot,
    Comma,
    Colon,
    At,
    InterpolationStart,
    Newline,
    Comment(String),
    Eof,
}

impl Token {
    pub fn display_name(&self) -> String {
        match self {
            Token::Keyword(kw) => format!("keyword '{}'", kw),
            Token::Identifier(s) => format!("'{}'", s),
            Token::Int(n) => format!("integer {}", n),
            Token::Float(n) => format!("number {}", n),
            Token::String(s) => format!("string \"{}\"", s),
            Token::Newline => "newline".to_string(),
            Token::Comment(_) => "comment".to_string(),
            Token::Eof => "end of file".to_string(),
            other => format!("'{}'", other),
        }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, Token::Newline | Token::Comment(_))
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Token::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Spelling of an identifier or keyword, for positions where keywords
    /// double as names.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Token::Identifier(s) => Some(s),
            Token::Keyword(kw) => Some(kw.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Keyword(kw) => write!(f, "{}", kw),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::StarStar => write!(f, "**"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Assign => write!(f, "="),
            Token::Arrow => write!(f, "->"),
            Token::FatArrow => write!(f, "=>"),
            Token::Question => write!(f, "?"),
            Token::QuestionDot => write!(f, "?."),
            Token::QuestionQuestion => write!(f, "??"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::At => write!(f, "@"),
            Token::InterpolationStart => write!(f, "#{{"),
            Token::Newline => write!(f, "newline"),
            Token::Comment(s) => write!(f, "#{}", s),
            Token::Eof => write!(f, "end of file"),
        }
    }
}

/// A token plus the raw text it was scanned from and where it sits.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub lexeme: String,
    pub span: Span,
    pub file: Arc<str>,
}

impl SpannedToken {
    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.col
    }
}
