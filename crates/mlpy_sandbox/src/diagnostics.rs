//! Sandbox-stage diagnostics (spec.md `7`: "spawn failure, resource
//! limit exceeded, capability denied, child crash, child nonzero exit").

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SandboxError {
    #[error("failed to spawn sandboxed child process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("resource limit exceeded: {which} limit was {limit}, observed {observed}")]
    ResourceLimitExceeded { which: ResourceKind, limit: u64, observed: u64 },

    #[error("capability denied: action '{action}' on resource '{resource}' requires '{capability}'")]
    CapabilityDenied { capability: String, resource: String, action: String },

    #[error("child process crashed: {0}")]
    ChildCrash(String),

    #[error("child process exited with nonzero status {0}")]
    ChildNonzeroExit(i32),

    #[error("failed to apply resource limits to child process: {0}")]
    LimitSetupFailed(String),
}

/// Which limit [`SandboxError::ResourceLimitExceeded`] reports a breach
/// of (spec.md `4.9`'s limit list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    WallClock,
    Memory,
    CpuTime,
    OutputLength,
    FileDescriptors,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WallClock => "wall-clock time",
            Self::Memory => "memory",
            Self::CpuTime => "CPU time",
            Self::OutputLength => "output length",
            Self::FileDescriptors => "file descriptor count",
        };
        f.write_str(s)
    }
}
