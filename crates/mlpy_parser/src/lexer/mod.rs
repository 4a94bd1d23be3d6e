mod kind;
mod token;

pub use kind::Kind;
pub use token::{Token, TokenValue};

use crate::diagnostics;
use mlpy_diagnostics::Error;
use mlpy_span::Span;
use std::{iter::Peekable, str::CharIndices};

/// Hand-written lexer. Whitespace-insensitive except inside string
/// literals; comments are recognized and discarded rather than emitted
/// as tokens (spec.md `3`).
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    column: u32,
    errors: Vec<Error>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, chars: source.char_indices().peekable(), line: 1, column: 1, errors: Vec::new() }
    }

    /// Lex the whole source eagerly. mlpy programs are small scripts, so
    /// there is no benefit to the incremental/streaming lexing oxc uses
    /// for multi-megabyte JS bundles.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Error>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == Kind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn byte_pos(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |(i, _)| *i)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump_char();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some((_, '/')) => {
                            while !matches!(self.peek_char(), Some('\n') | None) {
                                self.bump_char();
                            }
                        }
                        Some((_, '*')) => {
                            self.bump_char();
                            self.bump_char();
                            loop {
                                match self.bump_char() {
                                    None => break,
                                    Some((_, '*')) if self.peek_char() == Some('/') => {
                                        self.bump_char();
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    fn make_span(&self, start_byte: usize, start_line: u32, start_col: u32, end_byte: usize) -> Span {
        Span::new(start_byte as u32, end_byte as u32, start_line, start_col)
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let start_byte = self.byte_pos();
        let start_line = self.line;
        let start_col = self.column;

        let Some((_, c)) = self.bump_char() else {
            let span = self.make_span(start_byte, start_line, start_col, start_byte);
            return Token { kind: Kind::Eof, span, value: TokenValue::None };
        };

        let (kind, value) = match c {
            '(' => (Kind::LParen, TokenValue::None),
            ')' => (Kind::RParen, TokenValue::None),
            '{' => (Kind::LBrace, TokenValue::None),
            '}' => (Kind::RBrace, TokenValue::None),
            '[' => (Kind::LBracket, TokenValue::None),
            ']' => (Kind::RBracket, TokenValue::None),
            ',' => (Kind::Comma, TokenValue::None),
            '.' => (Kind::Dot, TokenValue::None),
            ';' => (Kind::Semicolon, TokenValue::None),
            ':' => (Kind::Colon, TokenValue::None),
            '?' => (Kind::Question, TokenValue::None),
            '+' => (Kind::Plus, TokenValue::None),
            '-' => (Kind::Minus, TokenValue::None),
            '*' => (Kind::Star, TokenValue::None),
            '/' => (Kind::Slash, TokenValue::None),
            '%' => (Kind::Percent, TokenValue::None),
            '=' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    (Kind::EqEq, TokenValue::None)
                } else if self.peek_char() == Some('>') {
                    self.bump_char();
                    (Kind::FatArrow, TokenValue::None)
                } else {
                    (Kind::Eq, TokenValue::None)
                }
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    (Kind::NotEq, TokenValue::None)
                } else {
                    (Kind::Bang, TokenValue::None)
                }
            }
            '<' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    (Kind::LtEq, TokenValue::None)
                } else {
                    (Kind::Lt, TokenValue::None)
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    (Kind::GtEq, TokenValue::None)
                } else {
                    (Kind::Gt, TokenValue::None)
                }
            }
            '&' if self.peek_char() == Some('&') => {
                self.bump_char();
                (Kind::AmpAmp, TokenValue::None)
            }
            '|' if self.peek_char() == Some('|') => {
                self.bump_char();
                (Kind::PipePipe, TokenValue::None)
            }
            '"' | '\'' => return self.read_string(c, start_byte, start_line, start_col),
            c if c.is_ascii_digit() => return self.read_number(start_byte, start_line, start_col),
            c if is_identifier_start(c) => return self.read_identifier(start_byte, start_line, start_col),
            _ => {
                let end = self.byte_pos();
                let span = self.make_span(start_byte, start_line, start_col, end);
                self.errors.push(diagnostics::UnexpectedToken(span).into());
                (Kind::Eof, TokenValue::None)
            }
        };

        let end = self.byte_pos();
        let span = self.make_span(start_byte, start_line, start_col, end);
        Token { kind, span, value }
    }

    fn read_identifier(&mut self, start_byte: usize, start_line: u32, start_col: u32) -> Token {
        while matches!(self.peek_char(), Some(c) if is_identifier_continue(c)) {
            self.bump_char();
        }
        let end = self.byte_pos();
        let text = &self.source[start_byte..end];
        let span = self.make_span(start_byte, start_line, start_col, end);
        if let Some(kind) = Kind::keyword(text) {
            Token { kind, span, value: TokenValue::None }
        } else {
            Token { kind: Kind::Identifier, span, value: TokenValue::Ident(text.to_string()) }
        }
    }

    /// Integers map to the integral value; a decimal point OR an
    /// exponent forces the floating variant (spec.md `4.1`: `42e0` is a
    /// float).
    fn read_number(&mut self, start_byte: usize, start_line: u32, start_col: u32) -> Token {
        let mut is_float = false;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.bump_char();
        }
        if self.peek_char() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit()) {
                is_float = true;
                self.bump_char();
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.bump_char();
                }
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let next_is_sign = matches!(lookahead.peek(), Some((_, '+' | '-')));
            if next_is_sign {
                lookahead.next();
            }
            if matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit()) {
                is_float = true;
                self.bump_char();
                if next_is_sign {
                    self.bump_char();
                }
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.bump_char();
                }
            }
        }

        let end = self.byte_pos();
        let span = self.make_span(start_byte, start_line, start_col, end);
        let text = &self.source[start_byte..end];
        let value = if is_float {
            match text.parse::<f64>() {
                Ok(v) => TokenValue::Float(v),
                Err(_) => {
                    self.errors.push(diagnostics::InvalidNumber(span).into());
                    TokenValue::Float(0.0)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => TokenValue::Int(v),
                Err(_) => {
                    self.errors.push(diagnostics::InvalidNumber(span).into());
                    TokenValue::Int(0)
                }
            }
        };
        Token { kind: Kind::Number, span, value }
    }

    /// Strings support escapes `\n \t \" \' \\ \0` and hex `\xNN`
    /// (spec.md `4.1`).
    fn read_string(&mut self, quote: char, start_byte: usize, start_line: u32, start_col: u32) -> Token {
        let mut value = String::new();
        loop {
            match self.bump_char() {
                None | Some((_, '\n')) => {
                    let end = self.byte_pos();
                    let span = self.make_span(start_byte, start_line, start_col, end);
                    self.errors.push(diagnostics::UnterminatedString(span).into());
                    return Token { kind: Kind::String, span, value: TokenValue::Str(value) };
                }
                Some((_, c)) if c == quote => break,
                Some((escape_start, '\\')) => {
                    let escape_line = self.line;
                    let escape_col = self.column - 1;
                    match self.bump_char() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, '"')) => value.push('"'),
                        Some((_, '\'')) => value.push('\''),
                        Some((_, '\\')) => value.push('\\'),
                        Some((_, '0')) => value.push('\0'),
                        Some((_, 'x')) => {
                            let mut hex = String::new();
                            for _ in 0..2 {
                                if matches!(self.peek_char(), Some(c) if c.is_ascii_hexdigit()) {
                                    hex.push(self.bump_char().unwrap().1);
                                }
                            }
                            match u8::from_str_radix(&hex, 16) {
                                Ok(byte) if hex.len() == 2 => value.push(byte as char),
                                _ => {
                                    let end = self.byte_pos();
                                    let span = self.make_span(escape_start, escape_line, escape_col, end);
                                    self.errors.push(diagnostics::InvalidEscape(span).into());
                                }
                            }
                        }
                        Some((_, other)) => {
                            let end = self.byte_pos();
                            let span = self.make_span(escape_start, escape_line, escape_col, end);
                            self.errors.push(diagnostics::InvalidEscape(span).into());
                            value.push(other);
                        }
                        None => {
                            let end = self.byte_pos();
                            let span = self.make_span(escape_start, escape_line, escape_col, end);
                            self.errors.push(diagnostics::InvalidEscape(span).into());
                        }
                    }
                }
                Some((_, c)) => value.push(c),
            }
        }
        let end = self.byte_pos();
        let span = self.make_span(start_byte, start_line, start_col, end);
        Token { kind: Kind::String, span, value: TokenValue::Str(value) }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<Kind> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn integer_is_int() {
        let (tokens, _) = Lexer::new("42").tokenize();
        assert_eq!(tokens[0].value, TokenValue::Int(42));
    }

    #[test]
    fn exponent_without_dot_is_float() {
        let (tokens, _) = Lexer::new("42e0").tokenize();
        assert_eq!(tokens[0].value, TokenValue::Float(42.0));
    }

    #[test]
    fn decimal_point_is_float() {
        let (tokens, _) = Lexer::new("3.5").tokenize();
        assert_eq!(tokens[0].value, TokenValue::Float(3.5));
    }

    #[test]
    fn dot_then_non_digit_is_separate_dot_token() {
        assert_eq!(kinds("x.y"), vec![Kind::Identifier, Kind::Dot, Kind::Identifier, Kind::Eof]);
    }

    #[test]
    fn string_escapes() {
        let (tokens, errors) = Lexer::new(r#""a\nb\x41""#).tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].value, TokenValue::Str("a\nbA".to_string()));
    }

    #[test]
    fn unterminated_string_reports_error() {
        let (_, errors) = Lexer::new("\"abc").tokenize();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(kinds("x // trailing comment\n+ /* block */ y"), vec![
            Kind::Identifier,
            Kind::Plus,
            Kind::Identifier,
            Kind::Eof
        ]);
    }

    #[test]
    fn fat_arrow_and_double_equals() {
        assert_eq!(kinds("=> =="), vec![Kind::FatArrow, Kind::EqEq, Kind::Eof]);
    }
}
