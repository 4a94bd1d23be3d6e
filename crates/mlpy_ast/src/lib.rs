//! Typed AST node variants and traversal infrastructure for mlpy
//! (spec.md `3`, `4.2`).

pub mod ast;
pub mod operators;
pub mod visit;

pub use ast::*;
pub use operators::{BinaryOperator, UnaryOperator};
pub use visit::Visit;
