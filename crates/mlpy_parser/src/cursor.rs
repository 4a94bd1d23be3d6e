use crate::lexer::{Kind, Token, TokenValue};
use mlpy_span::Span;

/// Token navigation helpers shared by the expression and statement
/// parsers. Tokens are lexed eagerly into a `Vec` (see `lexer::Lexer`),
/// so the cursor is just an index into that vector rather than a live
/// streaming lexer.
pub(crate) struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(crate) fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn cur_kind(&self) -> Kind {
        self.cur().kind
    }

    pub(crate) fn cur_span(&self) -> Span {
        self.cur().span
    }

    pub(crate) fn at(&self, kind: Kind) -> bool {
        self.cur_kind() == kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Kind {
        self.tokens.get(self.pos + offset).map_or(Kind::Eof, |t| t.kind)
    }

    /// Advance past the current token and return it.
    pub(crate) fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Advance past the current token only if it matches `kind`.
    pub(crate) fn eat(&mut self, kind: Kind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn prev_end(&self) -> u32 {
        if self.pos == 0 { 0 } else { self.tokens[self.pos - 1].span.end }
    }

    pub(crate) fn take_ident(&mut self) -> Option<String> {
        if let TokenValue::Ident(name) = &self.cur().value {
            let name = name.clone();
            self.bump();
            Some(name)
        } else {
            None
        }
    }
}
