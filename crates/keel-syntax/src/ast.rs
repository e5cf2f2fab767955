use crate::error::Span;
use crate::parser::{BlockOutput, parse_block_at};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub resources: Vec<Resource>,
    pub span: Span,
}

impl Program {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    /// Text of the `##` lines directly above the resource.
    pub documentation: Option<String>,
    pub leading_comment: Option<String>,
    pub fields: Vec<Field>,
    pub relationships: Vec<Relationship>,
    pub hooks: Vec<Hook>,
    pub custom_constraints: Vec<CustomConstraint>,
    pub span: Span,
}

impl Resource {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            documentation: None,
            leading_comment: None,
            fields: Vec::new(),
            relationships: Vec::new(),
            hooks: Vec::new(),
            custom_constraints: Vec::new(),
            span,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn add_hook(&mut self, hook: Hook) {
        self.hooks.push(hook);
    }

    pub fn add_custom_constraint(&mut self, constraint: CustomConstraint) {
        self.custom_constraints.push(constraint);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// `true` for `?`, `false` for `!` (and for a missing marker).
    pub nullable: bool,
    pub constraints: Vec<Constraint>,
    pub leading_comment: Option<String>,
    pub trailing_comment: Option<String>,
    pub span: Span,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type, nullable: bool, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
            constraints: Vec::new(),
            leading_comment: None,
            trailing_comment: None,
            span,
        }
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(String, Span),
    Array(Box<Type>, Span),
    Hash {
        key: Box<Type>,
        value: Box<Type>,
        span: Span,
    },
    Enum(Vec<String>, Span),
    Struct(Vec<Field>, Span),
    ResourceRef(String, Span),
}

impl Type {
    pub fn span(&self) -> &Span {
        match self {
            Type::Primitive(_, span) => span,
            Type::Array(_, span) => span,
            Type::Hash { span, .. } => span,
            Type::Enum(_, span) => span,
            Type::Struct(_, span) => span,
            Type::ResourceRef(_, span) => span,
        }
    }

    pub fn is_resource_ref(&self) -> bool {
        matches!(self, Type::ResourceRef(..))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(name, _) | Type::ResourceRef(name, _) => write!(f, "{}", name),
            Type::Array(element, _) => write!(f, "array<{}>", element),
            Type::Hash { key, value, .. } => write!(f, "hash<{}, {}>", key, value),
            Type::Enum(values, _) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
                write!(f, "enum[{}]", quoted.join(", "))
            }
            Type::Struct(fields, _) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        let marker = if field.nullable { '?' } else { '!' };
                        format!("{}: {}{}", field.name, field.ty, marker)
                    })
                    .collect();
                write!(f, "{{ {} }}", rendered.join(", "))
            }
        }
    }
}

/// A belongs-to association: a member whose type names another resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub target: String,
    pub nullable: bool,
    pub foreign_key: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub leading_comment: Option<String>,
    pub trailing_comment: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

pub const BUILTIN_CONSTRAINTS: &[&str] = &[
    "min",
    "max",
    "unique",
    "primary",
    "auto",
    "auto_update",
    "default",
    "pattern",
    "required",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub args: SmallVec<[Literal; 2]>,
    pub span: Span,
}

impl Constraint {
    pub fn is_builtin(&self) -> bool {
        BUILTIN_CONSTRAINTS.contains(&self.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Before,
    After,
}

impl HookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::Before => "before",
            HookKind::After => "after",
        }
    }
}

/// A lifecycle callback. The body is kept verbatim; interpreting it is left
/// to later stages (see [`Hook::parse_body`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Hook {
    pub kind: HookKind,
    pub trigger: String,
    /// Source text between the outer braces, byte-for-byte.
    pub body: String,
    pub body_span: Span,
    pub span: Span,
}

impl Hook {
    pub fn parse_body(&self, file: &str) -> BlockOutput {
        parse_block_at(&self.body, file, self.body_span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomConstraint {
    pub name: String,
    pub body: String,
    pub body_span: Span,
    pub span: Span,
}

impl CustomConstraint {
    pub fn parse_body(&self, file: &str) -> BlockOutput {
        parse_block_at(&self.body, file, self.body_span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: String,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElsifBranch {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// Shared shape of `if` and `unless`, in both expression and statement
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Expression,
    pub then_body: Vec<Statement>,
    pub elsif_branches: Vec<ElsifBranch>,
    pub else_body: Option<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal, Span),
    Nil(Span),
    Identifier(String, Span),
    SelfRef(Span),
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        span: Span,
    },
    NamespacedCall {
        namespace: String,
        function: String,
        args: Vec<Expression>,
        span: Span,
    },
    MethodCall {
        receiver: Box<Expression>,
        method: String,
        args: Vec<Expression>,
        span: Span,
    },
    FieldAccess {
        receiver: Box<Expression>,
        field: String,
        span: Span,
    },
    SafeNavigation {
        receiver: Box<Expression>,
        field: String,
        span: Span,
    },
    Index {
        receiver: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },
    Ternary {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
        span: Span,
    },
    NullCoalesce {
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
        span: Span,
    },
    Grouping(Box<Expression>, Span),
    Array(Vec<Expression>, Span),
    Hash(Vec<(String, Expression)>, Span),
    InterpolatedString {
        parts: Vec<StringPart>,
        span: Span,
    },
    Match {
        subject: Box<Expression>,
        cases: Vec<MatchCase>,
        span: Span,
    },
    If(Box<Conditional>),
    Unless(Box<Conditional>),
}

impl Expression {
    pub fn span(&self) -> &Span {
        match self {
            Expression::Literal(_, span) => span,
            Expression::Nil(span) => span,
            Expression::Identifier(_, span) => span,
            Expression::SelfRef(span) => span,
            Expression::Binary { span, .. } => span,
            Expression::Unary { span, .. } => span,
            Expression::Call { span, .. } => span,
            Expression::NamespacedCall { span, .. } => span,
            Expression::MethodCall { span, .. } => span,
            Expression::FieldAccess { span, .. } => span,
            Expression::SafeNavigation { span, .. } => span,
            Expression::Index { span, .. } => span,
            Expression::Ternary { span, .. } => span,
            Expression::NullCoalesce { span, .. } => span,
            Expression::Assign { span, .. } => span,
            Expression::Grouping(_, span) => span,
            Expression::Array(_, span) => span,
            Expression::Hash(_, span) => span,
            Expression::InterpolatedString { span, .. } => span,
            Expression::Match { span, .. } => span,
            Expression::If(cond) => &cond.span,
            Expression::Unless(cond) => &cond.span,
        }
    }

    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(..) | Expression::FieldAccess { .. } | Expression::Index { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        name: String,
        value: Expression,
        span: Span,
    },
    Return {
        value: Option<Expression>,
        span: Span,
    },
    If(Conditional),
    Unless(Conditional),
    Expression(Expression),
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::Let { span, .. } => span,
            Statement::Return { span, .. } => span,
            Statement::If(cond) => &cond.span,
            Statement::Unless(cond) => &cond.span,
            Statement::Expression(expr) => expr.span(),
        }
    }
}
