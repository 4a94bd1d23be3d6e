use miette::Diagnostic;
use mlpy_diagnostics::Severity;
use mlpy_span::Span;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("Duplicate parameter name `{1}`")]
pub struct DuplicateParameter(#[label("this parameter name is already used above")] pub Span, pub String);

#[derive(Debug, Error, Diagnostic)]
#[error("`return` outside of a function")]
pub struct ReturnOutsideFunction(#[label("not inside a function or arrow body")] pub Span);

#[derive(Debug, Error, Diagnostic)]
#[error("`{1}` outside of a loop")]
pub struct JumpOutsideLoop(#[label("not inside a while or for-in loop")] pub Span, pub &'static str);

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid assignment target")]
pub struct InvalidAssignmentTarget(#[label("assignments may only target identifiers, member access, or index access")] pub Span);

/// Blanket dunder rejection (spec.md `4.3`). Unconditional: no exceptions
/// for any syntactic context.
#[derive(Debug, Error, Diagnostic)]
#[error("`{1}` is a dangerous identifier (names beginning with `__` are never allowed in mlpy source)")]
pub struct DangerousIdentifier(#[label("dangerous identifier")] pub Span, pub String);

#[derive(Debug, Error, Diagnostic)]
#[error("`{1}` is forbidden and can never be whitelisted")]
pub struct ForbiddenName(#[label("forbidden name")] pub Span, pub String);

/// A finding from the deep (strict-mode) security analyzer: pattern
/// detection or taint analysis (spec.md `4.4`). Not every finding is
/// fatal — only `Severity::Critical` findings abort strict-mode
/// compilation (permissive mode reports and proceeds).
#[derive(Debug, Error, Diagnostic)]
#[error("{2}")]
pub struct SecurityFinding(#[label("{2}")] pub Span, pub Severity, pub String);
