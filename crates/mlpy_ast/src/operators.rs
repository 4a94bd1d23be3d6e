/// Unary operators. `typeof` is a built-in function, not an operator, so
/// it does not appear here (spec.md `3`, Function Whitelist).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `-x`
    Minus,
    /// `+x`
    Plus,
    /// `!x`
    Not,
}

impl UnaryOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Plus => "+",
            Self::Not => "!",
        }
    }
}

/// Binary operators, grouped the way the parser's precedence climbing
/// table groups them (spec.md `4.1`: "ternary below logical-or; ...
/// comparison non-associative with explicit parenthesization required
/// for chaining").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        }
    }

    /// Comparison operators are non-associative in the grammar: `a < b < c`
    /// is a parse error, the user must write `(a < b) < c`.
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual | Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual)
    }

    /// Whether this operator is part of the known-safe pure set the code
    /// generator may emit as a direct host operator instead of a
    /// `safe_call` wrapper (spec.md `4.5`, point 1).
    pub const fn is_pure(self) -> bool {
        true
    }
}
