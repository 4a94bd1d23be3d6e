//! POSIX resource limits applied to the sandboxed child (spec.md `4.9`:
//! "memory limit ... CPU time limit ... maximum file-descriptor
//! count"), via a `pre_exec` hook on Unix targets.
//!
//! Grounded on the `rlimit` crate's `setrlimit` wrapper; feature-gated
//! so the crate still builds on platforms without `setrlimit` (spec.md
//! `4.9` names these as POSIX-specific enforcement, everything else in
//! the sandbox — timeout, output truncation, capability checks — is
//! portable and lives in `process.rs` instead).

use crate::config::SandboxConfig;

#[cfg(unix)]
pub fn apply(config: &SandboxConfig, command: &mut std::process::Command) {
    use rlimit::Resource;
    use std::os::unix::process::CommandExt;

    let memory_limit_bytes = config.memory_limit_bytes;
    let cpu_time_limit_secs = config.cpu_time_limit.map(|d| d.as_secs());
    let max_file_descriptors = config.max_file_descriptors;

    // SAFETY: `setrlimit` is async-signal-safe and this hook touches
    // only the limits named above before `execvp` replaces the child
    // image; no allocation or non-reentrant libc call happens here.
    unsafe {
        command.pre_exec(move || {
            if let Some(bytes) = memory_limit_bytes {
                Resource::AS.set(bytes, bytes)?;
            }
            if let Some(secs) = cpu_time_limit_secs {
                Resource::CPU.set(secs, secs)?;
            }
            if let Some(count) = max_file_descriptors {
                Resource::NOFILE.set(count, count)?;
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn apply(_config: &SandboxConfig, _command: &mut std::process::Command) {
    tracing::warn!("resource limits (memory/CPU time/file descriptors) are not enforced on this platform");
}
