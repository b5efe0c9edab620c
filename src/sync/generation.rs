//! Generation tokens for discarding stale responses.
//!
//! Every request is stamped with the counter value current when it was
//! issued. A response may mutate visible state only while its token is
//! still the latest one issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token stamped on one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationToken(u64);

impl GenerationToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GenerationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Monotonic per-view request counter.
#[derive(Debug, Default)]
pub struct Generation {
    latest: AtomicU64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, invalidating every token issued before it.
    pub fn advance(&self) -> GenerationToken {
        GenerationToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> GenerationToken {
        GenerationToken(self.latest.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}
