//! Scoped property table
//!
//! While a [`SystemProperties`] scope is active the live table is a copy of
//! the original, so any change made by the work is thrown away with it. The
//! original table object is reinstalled on leave.

use indexmap::IndexMap;
use std::sync::Arc;
use sysstubs_core::ambient::{self, Properties};
use sysstubs_core::{ScopeError, ScopedMutation};

/// Property table restored after the scope
#[derive(Debug, Default)]
pub struct SystemProperties {
    overrides: IndexMap<String, Option<String>>,
    original: Option<Arc<Properties>>,
}

impl SystemProperties {
    /// Create scope without overrides
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` in the scoped copy
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove `key` from the scoped copy
    #[must_use]
    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), None);
        self
    }

    /// Configured overrides in insertion order
    #[inline]
    #[must_use]
    pub fn overrides(&self) -> &IndexMap<String, Option<String>> {
        &self.overrides
    }

    /// Run `work` against a copy of the property table
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

impl ScopedMutation for SystemProperties {
    fn name(&self) -> &'static str {
        "system properties"
    }

    fn enter(&mut self) -> Result<(), ScopeError> {
        if self.original.is_some() {
            return Err(ScopeError::AlreadyActive(self.name()));
        }
        let original = ambient::properties();
        let copy = original.copy();
        for (key, value) in &self.overrides {
            match value {
                Some(value) => copy.set(key.clone(), value.clone()),
                None => copy.remove(key),
            };
        }
        ambient::set_properties(Arc::new(copy));
        tracing::debug!(overrides = self.overrides.len(), "property table copied");
        self.original = Some(original);
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScopeError> {
        if let Some(original) = self.original.take() {
            ambient::set_properties(original);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.original.is_some()
    }
}

/// Run `work` and put the property table back afterwards
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn restore_system_properties<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    SystemProperties::new().execute(work)
}
