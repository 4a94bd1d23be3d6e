//! Cache-stage diagnostics (spec.md `7`: "Cache errors downgrade to
//! 'cache miss' — they never fail the compilation"). Every variant here
//! is something [`crate::Cache::get_or_compile`] catches and logs
//! rather than propagates; callers only ever see it via `tracing::warn!`
//! output, never as a `Result::Err` from a successful compilation.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("filesystem cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt on-disk artifact: {0}")]
    Corrupt(String),

    #[error("malformed cache index: {0}")]
    MalformedIndex(#[from] serde_json::Error),
}
