//! Parse-time diagnostics (spec.md `4.1`, "Failure modes").
//!
//! Each struct derives `thiserror::Error` + `miette::Diagnostic` and
//! converts into `mlpy_diagnostics::Error` via `.into()`, matching
//! `oxc_parser`'s `diagnostics` module.

use miette::Diagnostic;
use mlpy_span::Span;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("Unexpected token")]
pub struct UnexpectedToken(#[label("unexpected token here")] pub Span);

#[derive(Debug, Error, Diagnostic)]
#[error("Unterminated string literal")]
pub struct UnterminatedString(#[label("string starts here and is never closed")] pub Span);

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid escape sequence")]
pub struct InvalidEscape(#[label("this escape sequence is not recognized")] pub Span);

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid number literal")]
pub struct InvalidNumber(#[label("this is not a valid number")] pub Span);
