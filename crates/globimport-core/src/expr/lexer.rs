//! Lexer for the expression subset.
//!
//! Tokens are produced on demand by the parser, starting from an arbitrary
//! byte offset in the source. Regex literals and JSX are not recognized.

use super::parser::{ParseError, ParseErrorKind};
use super::span::Span;
use super::token::{keyword_from_str, Token, TokenKind};

/// The lexer state.
#[derive(Clone)]
pub struct Lexer<'a> {
    /// Source code.
    source: &'a str,
    /// Source code as bytes (for fast indexing).
    bytes: &'a [u8],
    /// Current byte position.
    pos: usize,
    /// Start position of the current token.
    token_start: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned at `offset`.
    pub fn new_at(source: &'a str, offset: usize) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: offset.min(source.len()),
            token_start: offset.min(source.len()),
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments()?;
        self.token_start = self.pos;

        if self.is_eof() {
            return Ok(self.make_token(TokenKind::Eof));
        }

        let ch = self.current();
        let kind = match ch {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | 0x80..=0xff => self.scan_identifier(),
            b'0'..=b'9' => self.scan_number(),
            b'"' | b'\'' => self.scan_string(ch)?,
            b'`' => self.scan_template()?,

            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b',' => self.single(TokenKind::Comma),
            b':' => self.single(TokenKind::Colon),
            b';' => self.single(TokenKind::Semicolon),
            b'~' => self.single(TokenKind::Tilde),
            b'^' => self.single(TokenKind::Caret),
            b'%' => self.single(TokenKind::Percent),
            b'/' => self.single(TokenKind::Slash),
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),

            b'.' => self.scan_dot(),
            b'?' => self.scan_question(),
            b'*' => self.scan_star(),
            b'=' => self.scan_equals(),
            b'!' => self.scan_bang(),
            b'<' => self.scan_less_than(),
            b'>' => self.scan_greater_than(),
            b'&' => self.scan_doubled(b'&', TokenKind::Amp, TokenKind::AmpAmp),
            b'|' => self.scan_doubled(b'|', TokenKind::Pipe, TokenKind::PipePipe),

            _ => {
                let c = self.current_char();
                self.pos += c.len_utf8();
                TokenKind::Invalid(c)
            }
        };

        Ok(self.make_token(kind))
    }

    // === Helper methods ===

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn current_char(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    fn peek_char(&self) -> u8 {
        self.bytes.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn peek_char_n(&self, n: usize) -> u8 {
        self.bytes.get(self.pos + n).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.token_start as u32, self.pos as u32))
    }

    fn error(&self, kind: ParseErrorKind, message: &str) -> ParseError {
        ParseError::with_kind(
            kind,
            message,
            Span::new(self.token_start as u32, self.pos as u32),
        )
    }

    // === Whitespace and comments ===

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => self.advance(),
                b'/' if self.peek_char() == b'/' => self.skip_line_comment(),
                b'/' if self.peek_char() == b'*' => self.skip_block_comment()?,
                0x80..=0xff if self.current_char().is_whitespace() => {
                    self.pos += self.current_char().len_utf8();
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.advance_n(2);
        while !self.is_eof() && self.current() != b'\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        self.token_start = self.pos;
        self.advance_n(2);
        while !self.is_eof() {
            if self.current() == b'*' && self.peek_char() == b'/' {
                self.advance_n(2);
                return Ok(());
            }
            self.advance();
        }
        Err(self.error(ParseErrorKind::UnterminatedComment, "Unterminated comment"))
    }

    // === Token scanning ===

    fn scan_identifier(&mut self) -> TokenKind {
        while !self.is_eof() {
            match self.current() {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' | 0x80..=0xff => {
                    self.advance();
                }
                _ => break,
            }
        }

        let ident = &self.source[self.token_start..self.pos];
        keyword_from_str(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;

        if self.current() == b'0' {
            let radix = match self.peek_char() {
                b'x' | b'X' => Some(16),
                b'b' | b'B' => Some(2),
                b'o' | b'O' => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                return self.scan_radix_number(radix);
            }
        }

        while self.current().is_ascii_digit() || self.current() == b'_' {
            self.advance();
        }

        if self.current() == b'.' {
            self.advance();
            while self.current().is_ascii_digit() || self.current() == b'_' {
                self.advance();
            }
        }

        if matches!(self.current(), b'e' | b'E') {
            self.advance();
            if matches!(self.current(), b'+' | b'-') {
                self.advance();
            }
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        if self.current() == b'n' {
            self.advance();
            return TokenKind::BigInt(self.source[start..self.pos - 1].to_string());
        }

        let num_str = self.source[start..self.pos].replace('_', "");
        TokenKind::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    fn scan_radix_number(&mut self, radix: u32) -> TokenKind {
        let start = self.pos;
        self.advance_n(2); // Skip 0x / 0b / 0o

        while (self.current() as char).is_digit(radix) || self.current() == b'_' {
            self.advance();
        }

        if self.current() == b'n' {
            self.advance();
            return TokenKind::BigInt(self.source[start..self.pos - 1].to_string());
        }

        let digits = self.source[start + 2..self.pos].replace('_', "");
        TokenKind::Number(u64::from_str_radix(&digits, radix).unwrap_or(0) as f64)
    }

    fn scan_string(&mut self, quote: u8) -> Result<TokenKind, ParseError> {
        let string_start = self.pos;
        self.advance(); // Skip opening quote

        let mut value = String::new();
        loop {
            if self.is_eof() {
                return Err(self.unterminated_string(string_start));
            }
            match self.current() {
                c if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String(value));
                }
                b'\n' | b'\r' => return Err(self.unterminated_string(string_start)),
                b'\\' => {
                    self.advance();
                    if self.is_eof() {
                        return Err(self.unterminated_string(string_start));
                    }
                    // Line continuation
                    if self.current() == b'\r' && self.peek_char() == b'\n' {
                        self.advance_n(2);
                    } else if matches!(self.current(), b'\n' | b'\r') {
                        self.advance();
                    } else {
                        value.push(self.scan_escape_sequence());
                    }
                }
                _ => {
                    let c = self.current_char();
                    value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }

    fn unterminated_string(&self, start: usize) -> ParseError {
        ParseError::with_kind(
            ParseErrorKind::UnterminatedString,
            "Unterminated string constant",
            Span::new(start as u32, self.pos as u32),
        )
    }

    fn scan_escape_sequence(&mut self) -> char {
        let ch = self.current_char();
        self.pos += ch.len_utf8();

        match ch {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !self.current().is_ascii_digit() => '\0',
            'x' => self.scan_hex_escape(2),
            'u' => {
                if self.current() == b'{' {
                    self.scan_unicode_escape_braces()
                } else {
                    self.scan_hex_escape(4)
                }
            }
            other => other,
        }
    }

    fn scan_hex_escape(&mut self, len: usize) -> char {
        let mut value = 0u32;
        for _ in 0..len {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    fn scan_unicode_escape_braces(&mut self) -> char {
        self.advance(); // Skip {
        let mut value = 0u32;
        while self.current() != b'}' && !self.is_eof() {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value.saturating_mul(16).saturating_add(digit);
                self.advance();
            } else {
                break;
            }
        }
        if self.current() == b'}' {
            self.advance();
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    /// Scan a whole template literal, skipping over `${...}` substitutions.
    fn scan_template(&mut self) -> Result<TokenKind, ParseError> {
        let template_start = self.pos;
        self.advance(); // Skip `

        let mut cooked = String::new();
        let mut substitutions = 0;
        loop {
            if self.is_eof() {
                return Err(ParseError::with_kind(
                    ParseErrorKind::UnterminatedTemplate,
                    "Unterminated template",
                    Span::new(template_start as u32, self.pos as u32),
                ));
            }
            match self.current() {
                b'`' => {
                    self.advance();
                    return Ok(TokenKind::Template {
                        cooked,
                        substitutions,
                    });
                }
                b'\\' => {
                    self.advance();
                    if !self.is_eof() {
                        cooked.push(self.scan_escape_sequence());
                    }
                }
                b'$' if self.peek_char() == b'{' => {
                    self.advance_n(2);
                    substitutions += 1;
                    self.skip_substitution(template_start)?;
                }
                _ => {
                    let c = self.current_char();
                    cooked.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }

    fn skip_substitution(&mut self, template_start: usize) -> Result<(), ParseError> {
        let mut depth = 1usize;
        while depth > 0 {
            if self.is_eof() {
                return Err(ParseError::with_kind(
                    ParseErrorKind::UnterminatedTemplate,
                    "Unterminated template",
                    Span::new(template_start as u32, self.pos as u32),
                ));
            }
            match self.current() {
                b'{' => {
                    depth += 1;
                    self.advance();
                }
                b'}' => {
                    depth -= 1;
                    self.advance();
                }
                quote @ (b'"' | b'\'') => {
                    self.scan_string(quote)?;
                }
                b'`' => {
                    self.scan_template()?;
                }
                b'/' if self.peek_char() == b'/' => self.skip_line_comment(),
                b'/' if self.peek_char() == b'*' => self.skip_block_comment()?,
                _ => self.advance(),
            }
        }
        Ok(())
    }

    // === Multi-character operators ===

    fn scan_dot(&mut self) -> TokenKind {
        if self.peek_char().is_ascii_digit() {
            return self.scan_number();
        }
        if self.peek_char() == b'.' && self.peek_char_n(2) == b'.' {
            self.advance_n(3);
            return TokenKind::Spread;
        }
        self.advance();
        TokenKind::Dot
    }

    fn scan_question(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'?' => {
                self.advance();
                TokenKind::QuestionQuestion
            }
            // `a?.5:b` is a conditional, not optional chaining
            b'.' if !self.peek_char().is_ascii_digit() => {
                self.advance();
                TokenKind::QuestionDot
            }
            _ => TokenKind::Question,
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'*' {
            self.advance();
            TokenKind::StarStar
        } else {
            TokenKind::Star
        }
    }

    fn scan_equals(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'>' => {
                self.advance();
                TokenKind::Arrow
            }
            b'=' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            _ => TokenKind::Eq,
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            if self.current() == b'=' {
                self.advance();
                TokenKind::BangEqEq
            } else {
                TokenKind::BangEq
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => {
                self.advance();
                TokenKind::LtEq
            }
            b'<' => {
                self.advance();
                TokenKind::LtLt
            }
            _ => TokenKind::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => {
                self.advance();
                TokenKind::GtEq
            }
            b'>' => {
                self.advance();
                if self.current() == b'>' {
                    self.advance();
                    TokenKind::GtGtGt
                } else {
                    TokenKind::GtGt
                }
            }
            _ => TokenKind::Gt,
        }
    }

    fn scan_doubled(&mut self, ch: u8, single: TokenKind, double: TokenKind) -> TokenKind {
        self.advance();
        if self.current() == ch {
            self.advance();
            double
        } else {
            single
        }
    }
}
