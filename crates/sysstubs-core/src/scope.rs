//! Scoped mutation protocol
//!
//! A [`ScopedMutation`] changes one piece of ambient state on `enter` and
//! puts it back on `leave`. [`Resources`] composes several of them around a
//! unit of work:
//! - Members are entered in the order they were added
//! - If an enter fails, the members already entered are left again
//! - After the work, every entered member is left in reverse order
//! - A panic in the work still leaves every entered member before unwinding on

use crate::config::config;
use crate::error::ScopeError;

/// A reversible change to ambient state
pub trait ScopedMutation {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Apply the change
    ///
    /// # Errors
    /// Returns [`ScopeError::AlreadyActive`] if already entered, or the
    /// mutation's own failure. A failed enter leaves ambient state untouched.
    fn enter(&mut self) -> Result<(), ScopeError>;

    /// Revert the change; does nothing when not entered
    ///
    /// # Errors
    /// Returns error if ambient state could not be restored
    fn leave(&mut self) -> Result<(), ScopeError>;

    /// Whether the change is currently applied
    fn is_active(&self) -> bool;
}

/// Ordered set of mutations applied around one unit of work
#[derive(Default)]
pub struct Resources<'a> {
    members: Vec<&'a mut dyn ScopedMutation>,
}

impl<'a> Resources<'a> {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member
    #[must_use]
    pub fn with(mut self, member: &'a mut dyn ScopedMutation) -> Self {
        self.members.push(member);
        self
    }

    /// Number of members
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Run `work` with every member entered
    ///
    /// An error from `work` is returned as is; restoration failures that
    /// happen alongside it are only logged. After successful work the first
    /// restoration failure is returned (or logged, without strict restore).
    ///
    /// # Errors
    /// Returns the first enter failure, the work's error, or a restoration
    /// failure
    pub fn execute<T, E, F>(self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<ScopeError>,
    {
        let mut active = ActiveSet::default();
        for member in self.members {
            tracing::debug!(resource = member.name(), "entering scope");
            if let Err(err) = member.enter() {
                tracing::debug!(resource = member.name(), error = %err, "enter failed");
                for failure in active.leave_all() {
                    tracing::warn!(error = %failure, "restore failed after aborted enter");
                }
                return Err(err.into());
            }
            active.entered.push(member);
        }

        let outcome = work();
        let mut failures = active.leave_all().into_iter();

        match outcome {
            Err(err) => {
                for failure in failures {
                    tracing::warn!(error = %failure, "restore failed after work error");
                }
                Err(err)
            }
            Ok(value) => match failures.next() {
                None => Ok(value),
                Some(first) => {
                    for failure in failures {
                        tracing::warn!(error = %failure, "additional restore failure");
                    }
                    if config().strict_restore {
                        Err(first.into())
                    } else {
                        tracing::warn!(error = %first, "restore failed");
                        Ok(value)
                    }
                }
            },
        }
    }
}

impl std::fmt::Debug for Resources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.members.iter().map(|m| m.name()))
            .finish()
    }
}

/// Entered members; leaves whatever is still entered when dropped
#[derive(Default)]
struct ActiveSet<'a> {
    entered: Vec<&'a mut dyn ScopedMutation>,
}

impl ActiveSet<'_> {
    fn leave_all(&mut self) -> Vec<ScopeError> {
        let mut failures = Vec::new();
        while let Some(member) = self.entered.pop() {
            tracing::debug!(resource = member.name(), "leaving scope");
            if let Err(err) = member.leave() {
                failures.push(err);
            }
        }
        failures
    }
}

impl Drop for ActiveSet<'_> {
    fn drop(&mut self) {
        if self.entered.is_empty() {
            return;
        }
        for failure in self.leave_all() {
            tracing::warn!(error = %failure, "restore failed while unwinding");
        }
    }
}

/// Run `work` inside a single mutation
///
/// # Errors
/// Same as [`Resources::execute`]
pub fn execute_scoped<T, E, F>(mutation: &mut dyn ScopedMutation, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    Resources::new().with(mutation).execute(work)
}
