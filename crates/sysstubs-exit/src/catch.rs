//! Exit interception scope

use crate::hook::install_quiet_hook;
use crate::policy::NoExitPolicy;
use crate::replacement::PolicyReplacement;
use crate::signal::ExitSignal;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use sysstubs_core::ambient::{self, SecurityPolicy};
use sysstubs_core::{config, ScopeError};

/// Run `work` and return the status of the first exit request it made
///
/// A [`NoExitPolicy`] wrapping the current policy is installed for the
/// duration of the work. Exit requests from any thread unwind that thread;
/// the scope swallows only its own signal. Other panics keep unwinding after
/// the original policy is back in place.
///
/// # Errors
/// Returns [`ScopeError::ExitNotCalled`] if no exit was requested, the work's
/// error, or a scope failure
pub fn catch_system_exit<E, F>(work: F) -> Result<i32, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    if config().quiet_exit_signals {
        install_quiet_hook();
    }
    let policy = Arc::new(NoExitPolicy::new(ambient::security_policy()));
    let installed: Arc<dyn SecurityPolicy> = policy.clone();
    let mut replacement = PolicyReplacement::new(Some(installed));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| replacement.execute(work)));

    match outcome {
        Ok(result) => result?,
        Err(payload) => match payload.downcast_ref::<ExitSignal>() {
            Some(signal) if signal.policy == policy.id() => {
                tracing::debug!(status = signal.status, "exit signal caught");
            }
            _ => panic::resume_unwind(payload),
        },
    }

    match policy.exit_status() {
        Some(status) => Ok(status),
        None => Err(ScopeError::ExitNotCalled.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn exit_in_same_thread() {
        let status = catch_system_exit(|| -> Result<(), ScopeError> { ambient::exit(42) }).unwrap();
        assert_eq!(status, 42);
    }

    #[test]
    #[serial]
    fn no_exit_is_an_error() {
        let result = catch_system_exit(|| Ok::<_, ScopeError>(()));
        assert_eq!(result, Err(ScopeError::ExitNotCalled));
        assert_eq!(
            ScopeError::ExitNotCalled.to_string(),
            "exit has not been called."
        );
    }
}
