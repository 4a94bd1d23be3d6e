use miette::Diagnostic;
use mlpy_span::Span;
use thiserror::Error;

/// Belt-and-suspenders dunder rejection at emission time (spec.md `4.5`
/// point 9): reachable even if the security analyzer that should have
/// caught this earlier was skipped or disabled.
#[derive(Debug, Error, Diagnostic)]
#[error("refusing to emit dangerous identifier `{1}`")]
pub struct RefusedDunderEmission(#[label("this identifier would be emitted verbatim")] pub Span, pub String);

/// An assignment expression nested inside a larger expression, with a
/// non-identifier target (spec.md `4.5` does not define a host-side
/// expression form for this; see `DESIGN.md`).
#[derive(Debug, Error, Diagnostic)]
#[error("assignment to a member or index expression is only supported as a statement, not nested inside another expression")]
pub struct UnsupportedNestedAssignment(#[label("this assignment is nested inside another expression")] pub Span);
