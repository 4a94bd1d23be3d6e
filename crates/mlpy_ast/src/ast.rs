//! AST node definitions (spec.md `3`).
//!
//! Every node carries its originating [`Span`]. The tree is built with
//! owned `Box` links rather than an arena: mlpy programs are small
//! (interactive scripts, not multi-megabyte bundles) so arena allocation
//! would trade away straightforward ownership for a performance win this
//! workload never needs.
//!
//! ASTs are immutable once the validator has run (spec.md `3`,
//! Lifecycle). Attributes the validator or analyzer derive (inferred
//! capability requirements, resolved import targets) are *not* stored on
//! the node: they live in side tables keyed by [`Span`], kept in the
//! owning pass's result type. This keeps `Expr`/`Stmt` plain data with no
//! interior mutability, at the cost of a span-keyed lookup for derived
//! facts — see `DESIGN.md` for the tradeoff.

use crate::operators::{BinaryOperator, UnaryOperator};
use mlpy_span::Span;

/// The root node of a parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub span: Span,
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NumberLiteral(Box<NumberLiteral>),
    StringLiteral(Box<StringLiteral>),
    BoolLiteral(Box<BoolLiteral>),
    NullLiteral(Box<NullLiteral>),
    Identifier(Box<IdentifierRef>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Ternary(Box<TernaryExpr>),
    Assignment(Box<AssignmentExpr>),
    Member(Box<MemberExpr>),
    Index(Box<IndexExpr>),
    Call(Box<CallExpr>),
    Array(Box<ArrayExpr>),
    Object(Box<ObjectExpr>),
    Arrow(Box<ArrowFunctionExpr>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::NumberLiteral(n) => n.span,
            Self::StringLiteral(n) => n.span,
            Self::BoolLiteral(n) => n.span,
            Self::NullLiteral(n) => n.span,
            Self::Identifier(n) => n.span,
            Self::Unary(n) => n.span,
            Self::Binary(n) => n.span,
            Self::Ternary(n) => n.span,
            Self::Assignment(n) => n.span,
            Self::Member(n) => n.span,
            Self::Index(n) => n.span,
            Self::Call(n) => n.span,
            Self::Array(n) => n.span,
            Self::Object(n) => n.span,
            Self::Arrow(n) => n.span,
        }
    }

    /// Whether this expression is syntactically a valid assignment
    /// target (invariant I2: identifiers, member accesses, or index
    /// accesses — nothing else).
    pub fn is_assignment_target(&self) -> bool {
        matches!(self, Self::Identifier(_) | Self::Member(_) | Self::Index(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    pub span: Span,
    pub value: NumberValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub span: Span,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolLiteral {
    pub span: Span,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullLiteral {
    pub span: Span,
}

/// Any bare-name reference: a variable read, a call target, an attribute
/// name, etc. The security analyzer inspects `name` regardless of which
/// syntactic position this node occupies (spec.md `4.3`).
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierRef {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub span: Span,
    pub operator: UnaryOperator,
    pub argument: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub span: Span,
    pub operator: BinaryOperator,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpr {
    pub span: Span,
    pub test: Expr,
    pub consequent: Expr,
    pub alternate: Expr,
}

/// `target = value`. `target` must satisfy
/// [`Expr::is_assignment_target`]; the validator rejects the ones that
/// don't (invariant I2).
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpr {
    pub span: Span,
    pub target: Expr,
    pub value: Expr,
}

/// `object.property`
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub span: Span,
    pub object: Expr,
    pub property: String,
    pub property_span: Span,
}

/// `object[index]`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub span: Span,
    pub object: Expr,
    pub index: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub span: Span,
    pub callee: Expr,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub span: Span,
    pub elements: Vec<Expr>,
}

/// An ordered string-keyed object literal. Order is preserved because ML
/// objects are ordered maps (spec.md `3`).
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpr {
    pub span: Span,
    pub properties: Vec<ObjectProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperty {
    pub span: Span,
    pub key: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: String,
}

/// `fn(params) => body`. A bodyless arrow (`=> expr`) is
/// [`ArrowBody::Expr`]; a braced body (`=> { ... }`) is
/// [`ArrowBody::Block`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunctionExpr {
    pub span: Span,
    pub params: Vec<Param>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Box<BlockStmt>),
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Box<ExprStmt>),
    FunctionDef(Box<FunctionDef>),
    If(Box<IfStmt>),
    While(Box<WhileStmt>),
    ForIn(Box<ForInStmt>),
    Break(Box<BreakStmt>),
    Continue(Box<ContinueStmt>),
    Return(Box<ReturnStmt>),
    Try(Box<TryStmt>),
    Throw(Box<ThrowStmt>),
    Import(Box<ImportStmt>),
    Capability(Box<CapabilityStmt>),
    Block(Box<BlockStmt>),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(n) => n.span,
            Self::FunctionDef(n) => n.span,
            Self::If(n) => n.span,
            Self::While(n) => n.span,
            Self::ForIn(n) => n.span,
            Self::Break(n) => n.span,
            Self::Continue(n) => n.span,
            Self::Return(n) => n.span,
            Self::Try(n) => n.span,
            Self::Throw(n) => n.span,
            Self::Import(n) => n.span,
            Self::Capability(n) => n.span,
            Self::Block(n) => n.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub span: Span,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub span: Span,
    pub name: String,
    pub params: Vec<Param>,
    pub body: BlockStmt,
}

/// `if (test) { ... } else { ... }`. `elif` chains are modeled by nesting
/// an `If` statement inside `alternate`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub test: Expr,
    pub consequent: BlockStmt,
    pub alternate: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub test: Expr,
    pub body: BlockStmt,
}

/// `for (binding in iterable) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForInStmt {
    pub span: Span,
    pub binding: String,
    pub iterable: Expr,
    pub body: BlockStmt,
}

/// Marker for whether a `break`/`continue` is inside a loop, filled in by
/// the validator (invariant I4). `None` until validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopContext {
    Unchecked,
    InsideLoop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakStmt {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStmt {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub argument: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub span: Span,
    pub param: Option<String>,
    pub body: BlockStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub span: Span,
    pub block: BlockStmt,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<BlockStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStmt {
    pub span: Span,
    pub argument: Expr,
}

/// `import a.b.c;`. The validator enforces that `path` is a simple
/// dotted name (no computed segments).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub span: Span,
    pub path: Vec<String>,
}

impl ImportStmt {
    pub fn dotted_name(&self) -> String {
        self.path.join(".")
    }

    pub fn module_name(&self) -> &str {
        self.path.first().map_or("", String::as_str)
    }
}

/// `capability name { ... }`. `name` must be a simple identifier
/// (invariant I5); resource patterns are string literals appearing
/// inside `body`, not part of this header.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityStmt {
    pub span: Span,
    pub name: String,
    pub body: BlockStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub span: Span,
    pub body: Vec<Stmt>,
}
