//! Token types for the expression subset of JavaScript.

use super::span::Span;

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Literals ===
    /// Identifier: `foo`, `_bar`, `$baz`
    Identifier(String),
    /// String literal: `"hello"`, `'world'`
    String(String),
    /// Number literal: `42`, `3.14`, `0xff`
    Number(f64),
    /// BigInt literal: `42n`
    BigInt(String),
    /// Whole template literal, substitutions included.
    Template { cooked: String, substitutions: usize },

    // === Keywords ===
    Import,
    Null,
    True,
    False,
    Typeof,
    Void,
    Delete,

    // === Punctuation ===
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Spread,
    Question,
    QuestionDot,
    QuestionQuestion,
    Arrow,

    // === Operators ===
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    Tilde,
    Eq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LtLt,
    GtGt,
    GtGtGt,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,

    /// End of input.
    Eof,
    /// Character the lexer does not understand.
    Invalid(char),
}

impl TokenKind {
    /// Identifier-like name of the token, for property names after `.`
    /// and object keys, where keywords are allowed.
    pub fn identifier_name(&self) -> Option<&str> {
        Some(match self {
            Self::Identifier(name) => name,
            Self::Import => "import",
            Self::Null => "null",
            Self::True => "true",
            Self::False => "false",
            Self::Typeof => "typeof",
            Self::Void => "void",
            Self::Delete => "delete",
            _ => return None,
        })
    }
}

/// Map an identifier to its keyword token, if it is one we care about.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    Some(match s {
        "import" => TokenKind::Import,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "typeof" => TokenKind::Typeof,
        "void" => TokenKind::Void,
        "delete" => TokenKind::Delete,
        _ => return None,
    })
}
