//! Capability tokens (spec.md `3`, `4.7`). A [`Token`] is an immutable
//! value once minted; nothing in this crate ever mutates one in place.

use mlpy_registry::CapabilityName;
use std::time::{Duration, SystemTime};

bitflags::bitflags! {
    /// The operations a token authorizes against resources matching its
    /// pattern. Not enumerated in spec.md beyond "a set of actions";
    /// grounded on the conventional read/write/execute/connect/delete
    /// split used by capability-based sandboxes (matches the shape
    /// `mlpy_sandbox`'s filesystem/network policy needs to check
    /// against).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Action: u8 {
        const READ = 0b0000_0001;
        const WRITE = 0b0000_0010;
        const EXECUTE = 0b0000_0100;
        const CONNECT = 0b0000_1000;
        const DELETE = 0b0001_0000;
    }
}

/// A monotonically increasing per-process counter, used to give each
/// minted token a nonce distinct from every other token this process
/// has ever minted (spec.md `3`: `Token{..., nonce}`).
static NEXT_NONCE: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

fn next_nonce() -> u64 {
    NEXT_NONCE.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

/// `Token{resource_pattern, actions, expiry?, issued_by, nonce}`
/// (spec.md `3`). Tokens are values: cloning a token does not mint a
/// new one, it copies the same grant (including its nonce), which is
/// the expected way to hand one token to multiple context frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub capability: CapabilityName,
    pub resource_pattern: String,
    pub actions: Action,
    pub expiry: Option<SystemTime>,
    pub issued_by: String,
    pub nonce: u64,
}

impl Token {
    pub fn new(capability: impl Into<CapabilityName>, resource_pattern: impl Into<String>, actions: Action, issued_by: impl Into<String>) -> Self {
        Self { capability: capability.into(), resource_pattern: resource_pattern.into(), actions, expiry: None, issued_by: issued_by.into(), nonce: next_nonce() }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expiry = Some(SystemTime::now() + ttl);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| SystemTime::now() >= expiry)
    }

    pub fn grants(&self, resource: &str, action: Action) -> bool {
        !self.is_expired() && self.actions.contains(action) && crate::glob::matches(&self.resource_pattern, resource)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grants_when_pattern_and_action_match() {
        let token = Token::new("fs.read", "fs/tmp/**", Action::READ, "test");
        assert!(token.grants("fs/tmp/data.txt", Action::READ));
        assert!(!token.grants("fs/tmp/data.txt", Action::WRITE));
        assert!(!token.grants("net/example.com", Action::READ));
    }

    #[test]
    fn expired_token_grants_nothing() {
        let token = Token::new("fs.read", "fs/**", Action::READ, "test").with_ttl(Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!token.grants("fs/tmp/data.txt", Action::READ));
    }

    #[test]
    fn each_mint_gets_a_distinct_nonce() {
        let a = Token::new("fs.read", "fs/**", Action::READ, "test");
        let b = Token::new("fs.read", "fs/**", Action::READ, "test");
        assert_ne!(a.nonce, b.nonce);
    }
}
