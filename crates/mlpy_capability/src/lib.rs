//! Capability token and context runtime contract (spec.md `4.7`).
//!
//! This crate has no notion of ML source or the host language it
//! compiles to; it is the data structures and glob matcher the
//! generated runtime prelude (`mlpy_codegen::runtime`) and the sandbox
//! (`mlpy_sandbox`) both link against to agree on what a token grants.

mod context;
mod glob;
mod token;

pub use context::CapabilityContext;
pub use token::{Action, Token};

pub use mlpy_registry::CapabilityName;

/// The same `*`/`**` segment glob this crate uses internally to match
/// a token's `resource_pattern` against a resource string, exposed for
/// `mlpy_sandbox`'s network policy allowlist (spec.md `4.9`), which
/// matches destinations against patterns with identical semantics.
pub fn glob_matches(pattern: &str, resource: &str) -> bool {
    glob::matches(pattern, resource)
}
