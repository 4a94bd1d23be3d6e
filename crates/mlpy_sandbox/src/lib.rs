//! Sandbox / Executor (spec.md `4.9`): runs a [`mlpy_cache::CompiledArtifact`]
//! in an isolated subprocess under resource limits, with a capability
//! manifest installed so the generated runtime prelude's
//! `safe_call`/`safe_attr_access`/`safe_method_call` dispatchers have
//! something to check against.
//!
//! Grounded on the retrieval pack's `TrevorS/lisp-llm-sandbox` module
//! layout (`config`, a `sandbox` execution loop, capability-based
//! security) adapted to mlpy's concrete contract: a Python-shaped host
//! program rather than a Lisp one, and `rlimit`-backed POSIX limits
//! instead of `cap-std`'s capability-oriented filesystem handles, since
//! mlpy's filesystem/network policy is already expressed as capability
//! tokens checked inside the generated program, not at the OS
//! sandboxing layer.

mod config;
mod diagnostics;
mod limits;
mod manifest;
mod process;

pub use config::{NetworkPolicy, SandboxConfig};
pub use diagnostics::{ResourceKind, SandboxError};
pub use manifest::{bootstrap_source, GrantedToken};
pub use process::{CapabilityViolation, Sandbox, SandboxResult};
