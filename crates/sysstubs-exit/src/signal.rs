//! Exit signal carried by an intercepted termination request

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_POLICY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one exit-intercepting policy instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyId(u64);

impl PolicyId {
    /// Allocate an identity never handed out before
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_POLICY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy-{}", self.0)
    }
}

/// Panic payload unwinding a thread whose exit request was intercepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("exit({status}) intercepted by {policy}")]
pub struct ExitSignal {
    /// Policy that intercepted the request
    pub policy: PolicyId,
    /// Requested exit status
    pub status: i32,
}
