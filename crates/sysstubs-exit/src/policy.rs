//! Security policy that turns exit requests into unwinding
//!
//! [`NoExitPolicy`] wraps whatever policy was installed before it. Exit
//! requests are recorded and answered by unwinding the requesting thread
//! with an [`ExitSignal`]; every other decision goes to the wrapped policy,
//! or is allowed when there is none.

use crate::signal::{ExitSignal, PolicyId};
use parking_lot::Mutex;
use std::sync::Arc;
use sysstubs_core::ambient::{Permission, PolicyViolation, SecurityPolicy};

/// Exit-intercepting security policy
#[derive(Debug)]
pub struct NoExitPolicy {
    id: PolicyId,
    wrapped: Option<Arc<dyn SecurityPolicy>>,
    status: Mutex<Option<i32>>,
}

impl NoExitPolicy {
    /// Create policy delegating non-exit decisions to `wrapped`
    #[must_use]
    pub fn new(wrapped: Option<Arc<dyn SecurityPolicy>>) -> Self {
        Self {
            id: PolicyId::fresh(),
            wrapped,
            status: Mutex::new(None),
        }
    }

    /// Identity carried by this policy's exit signals
    #[inline]
    #[must_use]
    pub fn id(&self) -> PolicyId {
        self.id
    }

    /// Status of the first intercepted exit request
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        *self.status.lock()
    }

    /// Policy that non-exit decisions are delegated to
    #[must_use]
    pub fn wrapped(&self) -> Option<&Arc<dyn SecurityPolicy>> {
        self.wrapped.as_ref()
    }
}

impl SecurityPolicy for NoExitPolicy {
    fn check_permission(&self, permission: &Permission) -> Result<(), PolicyViolation> {
        match &self.wrapped {
            Some(policy) => policy.check_permission(permission),
            None => Ok(()),
        }
    }

    fn check_exit(&self, status: i32) -> Result<(), PolicyViolation> {
        let recorded = *self.status.lock().get_or_insert(status);
        tracing::info!(status, recorded, policy = %self.id, "exit request intercepted");
        std::panic::panic_any(ExitSignal {
            policy: self.id,
            status,
        })
    }

    fn in_check(&self) -> bool {
        self.wrapped.as_ref().is_some_and(|policy| policy.in_check())
    }

    fn context(&self) -> Option<String> {
        self.wrapped.as_ref().and_then(|policy| policy.context())
    }

    fn thread_group(&self) -> Option<String> {
        self.wrapped.as_ref().and_then(|policy| policy.thread_group())
    }
}
