use super::Kind;
use mlpy_span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Kind,
    pub span: Span,
    pub value: TokenValue,
}
