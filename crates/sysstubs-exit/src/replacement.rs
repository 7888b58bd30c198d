//! Scoped replacement of the security policy

use std::sync::Arc;
use sysstubs_core::ambient::{self, SecurityPolicy};
use sysstubs_core::{ScopeError, ScopedMutation};

/// Installs a policy (or none) and reinstalls the original on leave
#[derive(Debug)]
pub struct PolicyReplacement {
    replacement: Option<Arc<dyn SecurityPolicy>>,
    original: Option<Option<Arc<dyn SecurityPolicy>>>,
}

impl PolicyReplacement {
    /// Create replacement installing `policy`
    #[must_use]
    pub fn new(policy: Option<Arc<dyn SecurityPolicy>>) -> Self {
        Self {
            replacement: policy,
            original: None,
        }
    }

    /// Run `work` with the replacement policy installed
    ///
    /// # Errors
    /// Returns the work's error or a scope failure
    pub fn execute<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<ScopeError>,
    {
        sysstubs_core::execute_scoped(self, work)
    }
}

impl ScopedMutation for PolicyReplacement {
    fn name(&self) -> &'static str {
        "security policy"
    }

    fn enter(&mut self) -> Result<(), ScopeError> {
        if self.original.is_some() {
            return Err(ScopeError::AlreadyActive(self.name()));
        }
        self.original = Some(ambient::set_security_policy(self.replacement.clone()));
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScopeError> {
        if let Some(original) = self.original.take() {
            ambient::set_security_policy(original);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.original.is_some()
    }
}

/// Run `work` with `policy` installed as the security policy
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn with_security_policy<T, E, F>(policy: Arc<dyn SecurityPolicy>, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    PolicyReplacement::new(Some(policy)).execute(work)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use sysstubs_core::ambient::{Permission, PolicyViolation};

    #[derive(Debug)]
    struct DenyFiles;

    impl SecurityPolicy for DenyFiles {
        fn check_permission(&self, permission: &Permission) -> Result<(), PolicyViolation> {
            match permission {
                Permission::FileRead { .. } => Err(PolicyViolation::new(permission.clone(), "no files")),
                _ => Ok(()),
            }
        }
    }

    #[test]
    #[serial]
    fn installs_then_restores_previous_policy() {
        let before = ambient::security_policy();
        let denied = with_security_policy(Arc::new(DenyFiles), || {
            Ok::<_, ScopeError>(
                ambient::check_permission(&Permission::FileRead {
                    path: "/etc/passwd".to_string(),
                })
                .is_err(),
            )
        })
        .unwrap();

        assert!(denied);
        let after = ambient::security_policy();
        match (before, after) {
            (None, None) => {}
            (Some(a), Some(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("security policy not restored"),
        }
    }
}
