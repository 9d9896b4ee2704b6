//! Recursive descent parser for a single expression anchored at an offset.
//!
//! Binary operators use precedence climbing. Parsing stops after the first
//! complete left-hand-side expression at the anchor; trailing source is
//! never looked at.

use super::ast::*;
use super::lexer::Lexer;
use super::span::Span;
use super::token::{Token, TokenKind};

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A string literal hit a line break or the end of input.
    UnterminatedString,
    UnterminatedTemplate,
    UnterminatedComment,
    UnexpectedToken,
    UnexpectedEof,
}

/// Parse error.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn with_kind(kind: ParseErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Whether this is the "unterminated string constant" condition.
    pub fn is_unterminated_string(&self) -> bool {
        self.kind == ParseErrorKind::UnterminatedString
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// The parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// End of the previously consumed token.
    prev_end: u32,
}

impl<'a> Parser<'a> {
    /// Create a parser whose first token starts at or after `offset`.
    pub fn new_at(source: &'a str, offset: usize) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new_at(source, offset);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            prev_end: current.span.start,
            current,
        })
    }

    /// Parse one left-hand-side expression: a primary followed by any
    /// member accesses and calls.
    pub fn parse_left_hand_side(&mut self) -> Result<Expr, ParseError> {
        self.parse_call_or_member()
    }

    // === Token helpers ===

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        let prev = std::mem::replace(&mut self.current, next);
        self.prev_end = prev.span.end;
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        if self.current.kind == TokenKind::Eof {
            ParseError::with_kind(
                ParseErrorKind::UnexpectedEof,
                "Unexpected end of input",
                self.current.span,
            )
        } else {
            ParseError::with_kind(
                ParseErrorKind::UnexpectedToken,
                "Unexpected token",
                self.current.span,
            )
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end)
    }

    // === Expressions ===

    /// Assignment-level expression without assignment: conditional and below.
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let test = self.parse_binary(1)?;

        if !self.eat(&TokenKind::Question)? {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: self.span_from(start),
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some((prec, op)) = binary_operator(&self.current.kind) {
            if prec < min_prec {
                break;
            }
            self.advance()?;
            // `**` is right-associative
            let next_min = if op == "**" { prec } else { prec + 1 };
            let right = self.parse_binary(next_min)?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current.kind {
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Typeof => "typeof",
            TokenKind::Void => "void",
            TokenKind::Delete => "delete",
            _ => return self.parse_call_or_member(),
        };
        let start = self.advance()?.span.start;
        let argument = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            argument: Box::new(argument),
            span: self.span_from(start),
        })
    }

    fn parse_call_or_member(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let mut expr = self.parse_primary()?;

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let name = self.parse_identifier_name()?;
                    expr = self.member(expr, MemberProp::Ident(name), false, start);
                }
                TokenKind::QuestionDot => {
                    self.advance()?;
                    match self.current.kind {
                        TokenKind::LParen => {
                            let arguments = self.parse_arguments()?;
                            expr = self.call(Callee::Expr(expr), arguments, None, true, start);
                        }
                        TokenKind::LBracket => {
                            self.advance()?;
                            let property = self.parse_expression()?;
                            self.expect(&TokenKind::RBracket)?;
                            expr = self.member(expr, MemberProp::Computed(property), true, start);
                        }
                        _ => {
                            let name = self.parse_identifier_name()?;
                            expr = self.member(expr, MemberProp::Ident(name), true, start);
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = self.member(expr, MemberProp::Computed(property), false, start);
                }
                TokenKind::LParen => {
                    let arguments = self.parse_arguments()?;
                    expr = self.call(Callee::Expr(expr), arguments, None, false, start);
                }
                TokenKind::Lt => match self.try_type_arguments()? {
                    Some(type_args) => {
                        let arguments = self.parse_arguments()?;
                        expr = self.call(Callee::Expr(expr), arguments, Some(type_args), false, start);
                    }
                    None => break,
                },
                _ => break,
            }
        }

        Ok(expr)
    }

    fn member(&self, object: Expr, property: MemberProp, optional: bool, start: u32) -> Expr {
        Expr::Member(Box::new(MemberExpr {
            object,
            property,
            optional,
            span: self.span_from(start),
        }))
    }

    fn call(
        &self,
        callee: Callee,
        arguments: Vec<Argument>,
        type_args: Option<String>,
        optional: bool,
        start: u32,
    ) -> Expr {
        Expr::Call(Box::new(CallExpr {
            callee,
            arguments,
            type_args,
            optional,
            span: self.span_from(start),
        }))
    }

    /// `<Name>(`: a single type argument directly before a call.
    fn try_type_arguments(&mut self) -> Result<Option<String>, ParseError> {
        let mut lookahead = self.lexer.clone();
        let name = match lookahead.next_token()?.kind {
            TokenKind::Identifier(name) => name,
            _ => return Ok(None),
        };
        if lookahead.next_token()?.kind != TokenKind::Gt
            || lookahead.next_token()?.kind != TokenKind::LParen
        {
            return Ok(None);
        }

        self.advance()?; // <
        self.advance()?; // Name
        self.expect(&TokenKind::Gt)?;
        Ok(Some(name))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut arguments = Vec::new();

        while !self.check(&TokenKind::RParen) {
            if self.eat(&TokenKind::Spread)? {
                arguments.push(Argument::Spread(self.parse_expression()?));
            } else {
                arguments.push(Argument::Expr(self.parse_expression()?));
            }
            if !self.check(&TokenKind::RParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RParen)?;
        Ok(arguments)
    }

    fn parse_identifier_name(&mut self) -> Result<String, ParseError> {
        match self.current.kind.identifier_name() {
            Some(name) => {
                let name = name.to_string();
                self.advance()?;
                Ok(name)
            }
            None => Err(self.unexpected()),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current.span;

        let literal = |value| Expr::Literal(Literal { value, span });
        let expr = match &self.current.kind {
            TokenKind::Identifier(name) => Expr::Identifier(Identifier {
                name: name.clone(),
                span,
            }),
            TokenKind::String(value) => literal(LitValue::String(value.clone())),
            TokenKind::Number(value) => literal(LitValue::Number(*value)),
            TokenKind::BigInt(value) => literal(LitValue::BigInt(value.clone())),
            TokenKind::True => literal(LitValue::Bool(true)),
            TokenKind::False => literal(LitValue::Bool(false)),
            TokenKind::Null => literal(LitValue::Null),
            TokenKind::Template {
                cooked,
                substitutions,
            } => Expr::Template {
                cooked: cooked.clone(),
                substitutions: *substitutions,
                span,
            },
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(expr);
            }
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_object(),
            TokenKind::Import => return self.parse_import(),
            _ => return Err(self.unexpected()),
        };

        self.advance()?;
        Ok(expr)
    }

    /// `import.meta` or `import(...)`.
    fn parse_import(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance()?.span.start;

        if self.eat(&TokenKind::Dot)? {
            match &self.current.kind {
                TokenKind::Identifier(name) if name == "meta" => {
                    self.advance()?;
                    Ok(Expr::MetaProperty(self.span_from(start)))
                }
                _ => Err(self.unexpected()),
            }
        } else if self.check(&TokenKind::LParen) {
            let arguments = self.parse_arguments()?;
            Ok(self.call(Callee::Import, arguments, None, false, start))
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::LBracket)?.span.start;
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RBracket) {
            if self.eat(&TokenKind::Comma)? {
                elements.push(None);
                continue;
            }
            let element = if self.eat(&TokenKind::Spread)? {
                ArrayElement::Spread(self.parse_expression()?)
            } else {
                ArrayElement::Expr(self.parse_expression()?)
            };
            elements.push(Some(element));
            if !self.check(&TokenKind::RBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Array(ArrayLit {
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::LBrace)?.span.start;
        let mut members = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            if self.eat(&TokenKind::Spread)? {
                members.push(ObjectMember::Spread(self.parse_expression()?));
            } else {
                members.push(self.parse_property()?);
            }
            if !self.check(&TokenKind::RBrace) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Object(ObjectLit {
            members,
            span: self.span_from(start),
        }))
    }

    fn parse_property(&mut self) -> Result<ObjectMember, ParseError> {
        let key_span = self.current.span;

        let key = match &self.current.kind {
            TokenKind::String(value) => {
                let key = PropKey::String(value.clone());
                self.advance()?;
                key
            }
            TokenKind::Number(value) => {
                let key = PropKey::Number(*value);
                self.advance()?;
                key
            }
            TokenKind::LBracket => {
                self.advance()?;
                let key = self.parse_expression()?;
                self.expect(&TokenKind::RBracket)?;
                PropKey::Computed(key)
            }
            _ => PropKey::Ident(self.parse_identifier_name()?),
        };

        if self.eat(&TokenKind::Colon)? {
            let value = self.parse_expression()?;
            return Ok(ObjectMember::Property {
                key,
                value,
                shorthand: false,
                span: self.span_from(key_span.start),
            });
        }

        // `{ foo }`
        match key {
            PropKey::Ident(name)
                if self.check(&TokenKind::Comma) || self.check(&TokenKind::RBrace) =>
            {
                let value = Expr::Identifier(Identifier {
                    name: name.clone(),
                    span: key_span,
                });
                Ok(ObjectMember::Property {
                    key: PropKey::Ident(name),
                    value,
                    shorthand: true,
                    span: key_span,
                })
            }
            _ => Err(self.unexpected()),
        }
    }
}

/// Binary operator precedence and text, higher binds tighter.
fn binary_operator(kind: &TokenKind) -> Option<(u8, &'static str)> {
    Some(match kind {
        TokenKind::QuestionQuestion => (1, "??"),
        TokenKind::PipePipe => (2, "||"),
        TokenKind::AmpAmp => (3, "&&"),
        TokenKind::Pipe => (4, "|"),
        TokenKind::Caret => (5, "^"),
        TokenKind::Amp => (6, "&"),
        TokenKind::EqEq => (7, "=="),
        TokenKind::BangEq => (7, "!="),
        TokenKind::EqEqEq => (7, "==="),
        TokenKind::BangEqEq => (7, "!=="),
        TokenKind::Lt => (8, "<"),
        TokenKind::LtEq => (8, "<="),
        TokenKind::Gt => (8, ">"),
        TokenKind::GtEq => (8, ">="),
        TokenKind::LtLt => (9, "<<"),
        TokenKind::GtGt => (9, ">>"),
        TokenKind::GtGtGt => (9, ">>>"),
        TokenKind::Plus => (10, "+"),
        TokenKind::Minus => (10, "-"),
        TokenKind::Star => (11, "*"),
        TokenKind::Slash => (11, "/"),
        TokenKind::Percent => (11, "%"),
        TokenKind::StarStar => (12, "**"),
        _ => return None,
    })
}
