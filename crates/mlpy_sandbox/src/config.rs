//! Sandbox configuration (spec.md `4.9`'s limit list): the knobs a
//! caller sets before [`crate::Sandbox::execute`], one field per limit
//! named in the specification.

use std::time::Duration;

/// Network access policy (spec.md `4.9`: "deny by default; optional
/// allowlist of destinations or 'allow any'").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NetworkPolicy {
    #[default]
    Deny,
    Allowlist(Vec<String>),
    AllowAny,
}

impl NetworkPolicy {
    pub fn permits(&self, destination: &str) -> bool {
        match self {
            Self::Deny => false,
            Self::AllowAny => true,
            Self::Allowlist(allowed) => allowed.iter().any(|pattern| mlpy_capability::glob_matches(pattern, destination)),
        }
    }
}

/// `SandboxConfig` (spec.md `4.9`): every field corresponds to one of
/// the limits the sandbox enforces around the child process.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub wall_clock_timeout: Duration,
    pub memory_limit_bytes: Option<u64>,
    pub cpu_time_limit: Option<Duration>,
    /// Readable/writable path patterns (spec.md `4.9`: "filesystem
    /// whitelist"), checked against the capability manifest's `fs.*`
    /// grants rather than enforced again at the OS level — the glob
    /// semantics are the same ones `mlpy_capability::glob` already
    /// implements, and re-stating them as raw OS-level path jails would
    /// double the surface this sandbox has to keep in sync.
    pub filesystem_whitelist: Vec<String>,
    pub network_policy: NetworkPolicy,
    pub max_output_bytes: usize,
    pub max_file_descriptors: Option<u64>,
    /// Restricts writes to a temporary directory only (spec.md `4.9`).
    pub writes_restricted_to_temp_dir: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            wall_clock_timeout: Duration::from_secs(10),
            memory_limit_bytes: Some(256 * 1024 * 1024),
            cpu_time_limit: Some(Duration::from_secs(10)),
            filesystem_whitelist: Vec::new(),
            network_policy: NetworkPolicy::default(),
            max_output_bytes: 1024 * 1024,
            max_file_descriptors: Some(64),
            writes_restricted_to_temp_dir: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deny_permits_nothing() {
        assert!(!NetworkPolicy::Deny.permits("example.com"));
    }

    #[test]
    fn allow_any_permits_everything() {
        assert!(NetworkPolicy::AllowAny.permits("example.com"));
    }

    #[test]
    fn allowlist_matches_by_glob() {
        let policy = NetworkPolicy::Allowlist(vec!["*.example.com".to_string()]);
        assert!(policy.permits("api.example.com"));
        assert!(!policy.permits("api.other.com"));
    }
}
