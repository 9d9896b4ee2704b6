//! AST for the expression subset parsed at glob-import call sites.

use super::span::Span;

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(Identifier),
    /// Template literal; only the cooked text of the quasis is kept.
    Template {
        cooked: String,
        substitutions: usize,
        span: Span,
    },
    Array(ArrayLit),
    Object(ObjectLit),
    /// `import.meta`
    MetaProperty(Span),
    Member(Box<MemberExpr>),
    Call(Box<CallExpr>),
    Unary {
        op: &'static str,
        argument: Box<Expr>,
        span: Span,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    /// Source span of the expression. Parentheses are not included.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(lit) => lit.span,
            Self::Identifier(ident) => ident.span,
            Self::Template { span, .. }
            | Self::MetaProperty(span)
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::Conditional { span, .. } => *span,
            Self::Array(array) => array.span,
            Self::Object(object) => object.span,
            Self::Member(member) => member.span,
            Self::Call(call) => call.span,
        }
    }

    /// ESTree node type name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "Literal",
            Self::Identifier(_) => "Identifier",
            Self::Template { .. } => "TemplateLiteral",
            Self::Array(_) => "ArrayExpression",
            Self::Object(_) => "ObjectExpression",
            Self::MetaProperty(_) => "MetaProperty",
            Self::Member(_) => "MemberExpression",
            Self::Call(call) => match call.callee {
                Callee::Import => "ImportExpression",
                Callee::Expr(_) => "CallExpression",
            },
            Self::Unary { .. } => "UnaryExpression",
            Self::Binary { op, .. } if matches!(*op, "&&" | "||" | "??") => "LogicalExpression",
            Self::Binary { .. } => "BinaryExpression",
            Self::Conditional { .. } => "ConditionalExpression",
        }
    }
}

/// A literal value with its span.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LitValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
    String(String),
    Number(f64),
    BigInt(String),
    Bool(bool),
    Null,
}

impl LitValue {
    /// `typeof` of the literal as JavaScript reports it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::Bool(_) => "boolean",
            Self::Null => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLit {
    /// `None` marks a hole (`[a, , b]`).
    pub elements: Vec<Option<ArrayElement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLit {
    pub members: Vec<ObjectMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Property {
        key: PropKey,
        value: Expr,
        shorthand: bool,
        span: Span,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    String(String),
    Number(f64),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub object: Expr,
    pub property: MemberProp,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Ident(String),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Callee,
    pub arguments: Vec<Argument>,
    /// TypeScript type arguments written as `f<T>(...)`.
    pub type_args: Option<String>,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Expr(Expr),
    /// Dynamic `import(...)`.
    Import,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}
