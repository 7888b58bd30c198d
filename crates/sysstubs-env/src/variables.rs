//! Environment variable overrides
//!
//! An [`EnvironmentVariables`] set is an ordered list of overrides. While it
//! is active the ambient environment holds the overrides; afterwards every
//! table of the backend is restored to its exact pre-scope contents.

use indexmap::IndexMap;
use std::sync::Arc;
use sysstubs_core::ambient::{self, EnvSnapshot, EnvironmentBackend, OpaqueEntries};
use sysstubs_core::{ScopeError, ScopedMutation};

/// Value accepted for an override; `None` unsets the variable
pub trait IntoVarValue {
    /// Convert into an optional value
    fn into_var_value(self) -> Option<String>;
}

impl IntoVarValue for &str {
    fn into_var_value(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoVarValue for String {
    fn into_var_value(self) -> Option<String> {
        Some(self)
    }
}

impl IntoVarValue for &String {
    fn into_var_value(self) -> Option<String> {
        Some(self.clone())
    }
}

impl IntoVarValue for Option<&str> {
    fn into_var_value(self) -> Option<String> {
        self.map(str::to_string)
    }
}

impl IntoVarValue for Option<String> {
    fn into_var_value(self) -> Option<String> {
        self
    }
}

/// Pre-scope state of the backend being overridden
#[derive(Debug)]
struct Saved {
    backend: Arc<dyn EnvironmentBackend>,
    primary: EnvSnapshot,
    opaque: OpaqueEntries,
    case_insensitive: Option<EnvSnapshot>,
}

impl Saved {
    fn capture(backend: Arc<dyn EnvironmentBackend>) -> Self {
        let primary = backend.primary().snapshot();
        let opaque = backend.primary().opaque_entries();
        let case_insensitive = backend.case_insensitive().map(|table| table.snapshot());
        Self {
            backend,
            primary,
            opaque,
            case_insensitive,
        }
    }

    /// Every table is restored even when an earlier one fails; the first
    /// failure is reported.
    fn restore(&self) -> Result<(), ScopeError> {
        let primary = self.backend.primary();
        let outcomes = [
            primary.replace_all(&self.primary),
            primary.restore_opaque(&self.opaque),
            match (self.backend.case_insensitive(), &self.case_insensitive) {
                (Some(table), Some(snapshot)) => table.replace_all(snapshot),
                _ => Ok(()),
            },
        ];
        for outcome in outcomes {
            outcome?;
        }
        Ok(())
    }
}

/// Ordered set of environment overrides
#[derive(Debug, Default)]
pub struct EnvironmentVariables {
    variables: IndexMap<String, Option<String>>,
    saved: Option<Saved>,
}

impl Clone for EnvironmentVariables {
    fn clone(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            saved: None,
        }
    }
}

impl EnvironmentVariables {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding one override
    pub fn with(name: impl Into<String>, value: impl IntoVarValue) -> Self {
        let mut variables = IndexMap::new();
        variables.insert(name.into(), value.into_var_value());
        Self {
            variables,
            saved: None,
        }
    }

    /// Set built from pairs
    ///
    /// # Errors
    /// Returns [`ScopeError::DuplicateVariable`] if a name repeats
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ScopeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoVarValue,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert_new(name.into(), value.into_var_value())?;
        }
        Ok(set)
    }

    /// New set with one more override; `self` is unchanged
    ///
    /// # Errors
    /// Returns [`ScopeError::DuplicateVariable`] if `name` is already present
    pub fn and(&self, name: impl Into<String>, value: impl IntoVarValue) -> Result<Self, ScopeError> {
        let mut fork = self.clone();
        fork.insert_new(name.into(), value.into_var_value())?;
        Ok(fork)
    }

    /// New set that additionally unsets `name`
    ///
    /// # Errors
    /// Returns [`ScopeError::DuplicateVariable`] if `name` is already present
    pub fn and_unset(&self, name: impl Into<String>) -> Result<Self, ScopeError> {
        self.and(name, None::<String>)
    }

    /// Add or replace an override in place
    ///
    /// While the set is active the change is applied to the ambient
    /// environment immediately.
    ///
    /// # Errors
    /// Returns error if the live environment rejects the change
    pub fn set(&mut self, name: impl Into<String>, value: impl IntoVarValue) -> Result<&mut Self, ScopeError> {
        let name = name.into();
        let value = value.into_var_value();
        if let Some(saved) = &self.saved {
            apply_one(saved.backend.as_ref(), &name, value.as_deref())?;
        }
        self.variables.insert(name, value);
        Ok(self)
    }

    /// Configured overrides in insertion order
    #[inline]
    #[must_use]
    pub fn variables(&self) -> &IndexMap<String, Option<String>> {
        &self.variables
    }

    /// Run `work` with the overrides applied
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

    fn insert_new(&mut self, name: String, value: Option<String>) -> Result<(), ScopeError> {
        if let Some(existing) = self.variables.get(&name) {
            return Err(ScopeError::DuplicateVariable {
                name,
                value,
                existing: existing.clone(),
            });
        }
        self.variables.insert(name, value);
        Ok(())
    }

    fn apply(&self, backend: &dyn EnvironmentBackend) -> Result<(), ScopeError> {
        for (name, value) in &self.variables {
            apply_one(backend, name, value.as_deref())?;
        }
        Ok(())
    }
}

fn apply_one(backend: &dyn EnvironmentBackend, name: &str, value: Option<&str>) -> Result<(), ScopeError> {
    let tables = std::iter::once(backend.primary()).chain(backend.case_insensitive());
    for table in tables {
        match value {
            Some(value) => table.set(name, value)?,
            None => table.remove(name)?,
        }
    }
    Ok(())
}

impl ScopedMutation for EnvironmentVariables {
    fn name(&self) -> &'static str {
        "environment variables"
    }

    fn enter(&mut self) -> Result<(), ScopeError> {
        if self.saved.is_some() {
            return Err(ScopeError::AlreadyActive(self.name()));
        }
        let saved = Saved::capture(ambient::environment());
        if let Err(err) = self.apply(saved.backend.as_ref()) {
            if let Err(restore) = saved.restore() {
                tracing::warn!(error = %restore, "failed to undo partial environment override");
            }
            return Err(err);
        }
        tracing::debug!(count = self.variables.len(), "environment overrides applied");
        self.saved = Some(saved);
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScopeError> {
        match self.saved.take() {
            Some(saved) => saved
                .restore()
                .map_err(|err| ScopeError::restore_failed(self.name(), err.to_string())),
            None => Ok(()),
        }
    }

    fn is_active(&self) -> bool {
        self.saved.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::sync::atomic::{AtomicBool, Ordering};
    use sysstubs_core::ambient::{EnvTable, InMemoryEnvironment, MemoryTable};
    use sysstubs_core::EnvironmentError;

    struct FakeEnvironment {
        backend: Arc<InMemoryEnvironment>,
        previous: Option<Arc<dyn EnvironmentBackend>>,
    }

    impl FakeEnvironment {
        fn install(backend: InMemoryEnvironment) -> Self {
            let backend = Arc::new(backend);
            let previous = ambient::set_environment(backend.clone());
            Self {
                backend,
                previous: Some(previous),
            }
        }
    }

    impl Drop for FakeEnvironment {
        fn drop(&mut self) {
            if let Some(previous) = self.previous.take() {
                ambient::set_environment(previous);
            }
        }
    }

    #[test]
    fn and_forks_without_touching_original() {
        let base = EnvironmentVariables::with("A", "1");
        let forked = base.and("B", "2").unwrap();
        assert_eq!(base.variables().len(), 1);
        assert_eq!(forked.variables().len(), 2);
        assert!(!forked.is_active());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let err = EnvironmentVariables::with("A", None::<String>)
            .and("A", "v")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The environment variable 'A' cannot be set to 'v' because it was already set to <unset>."
        );
    }

    #[test]
    fn from_pairs_rejects_duplicates() {
        assert!(EnvironmentVariables::from_pairs([("A", "1"), ("B", "2")]).is_ok());
        assert!(matches!(
            EnvironmentVariables::from_pairs([("A", "1"), ("A", "2")]),
            Err(ScopeError::DuplicateVariable { .. })
        ));
    }

    #[test]
    #[serial]
    fn applies_and_restores_both_tables() {
        let fake = FakeEnvironment::install(
            InMemoryEnvironment::new()
                .with_case_insensitive_table()
                .with_var("KEEP", "k")
                .unwrap()
                .with_var("DROP", "d")
                .unwrap(),
        );
        let primary_before = fake.backend.primary().snapshot();
        let folded_before = fake.backend.case_insensitive().map(|table| table.snapshot());

        let mut overrides = EnvironmentVariables::with("NEW", "n").and_unset("DROP").unwrap();
        overrides
            .execute(|| {
                assert_eq!(ambient::var("NEW").as_deref(), Some("n"));
                assert_eq!(ambient::var("DROP"), None);
                let folded = ambient::environment().case_insensitive().and_then(|t| t.get("new"));
                assert_eq!(folded.as_deref(), Some("n"));
                Ok::<_, ScopeError>(())
            })
            .unwrap();

        assert_eq!(fake.backend.primary().snapshot(), primary_before);
        assert_eq!(fake.backend.case_insensitive().map(|table| table.snapshot()), folded_before);
    }

    #[test]
    #[serial]
    fn set_applies_live_while_active() {
        let _fake = FakeEnvironment::install(InMemoryEnvironment::new());
        let mut overrides = EnvironmentVariables::new();

        overrides.enter().unwrap();
        overrides.set("LIVE", "yes").unwrap();
        assert_eq!(ambient::var("LIVE").as_deref(), Some("yes"));
        overrides.leave().unwrap();

        assert_eq!(ambient::var("LIVE"), None);
        assert_eq!(overrides.variables().get("LIVE"), Some(&Some("yes".to_string())));
    }

    /// Table whose writes start failing once `broken` is set
    #[derive(Debug, Default)]
    struct FlakyTable {
        inner: MemoryTable,
        broken: AtomicBool,
    }

    impl EnvTable for FlakyTable {
        fn get(&self, name: &str) -> Option<String> {
            self.inner.get(name)
        }

        fn set(&self, name: &str, value: &str) -> Result<(), EnvironmentError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(EnvironmentError::Backend("table is read-only".to_string()));
            }
            self.inner.set(name, value)
        }

        fn remove(&self, name: &str) -> Result<(), EnvironmentError> {
            self.inner.remove(name)
        }

        fn snapshot(&self) -> EnvSnapshot {
            self.inner.snapshot()
        }
    }

    #[derive(Debug)]
    struct FlakyEnvironment {
        primary: FlakyTable,
        folded: MemoryTable,
    }

    impl EnvironmentBackend for FlakyEnvironment {
        fn primary(&self) -> &dyn EnvTable {
            &self.primary
        }

        fn case_insensitive(&self) -> Option<&dyn EnvTable> {
            Some(&self.folded)
        }
    }

    #[test]
    #[serial]
    fn failed_primary_restore_still_restores_folded_table() {
        let backend = Arc::new(FlakyEnvironment {
            primary: FlakyTable::default(),
            folded: MemoryTable::case_insensitive(),
        });
        backend.primary.set("KEEP", "k").unwrap();
        backend.folded.set("KEEP", "k").unwrap();
        let folded_before = backend.folded.snapshot();
        let previous = ambient::set_environment(backend.clone());

        let mut overrides = EnvironmentVariables::with("KEEP", "changed").and("NEW", "n").unwrap();
        overrides.enter().unwrap();
        backend.primary.broken.store(true, Ordering::SeqCst);
        let result = overrides.leave();
        ambient::set_environment(previous);

        assert!(matches!(result, Err(ScopeError::RestoreFailed { .. })));
        assert!(!overrides.is_active());
        assert_eq!(backend.folded.snapshot(), folded_before);
    }

    #[test]
    #[serial]
    fn invalid_name_leaves_environment_untouched() {
        let fake = FakeEnvironment::install(InMemoryEnvironment::new().with_var("A", "1").unwrap());
        let mut overrides = EnvironmentVariables::with("B", "2").and("BAD=NAME", "x").unwrap();

        let result = overrides.execute(|| Ok::<_, ScopeError>(()));

        assert!(matches!(result, Err(ScopeError::Environment(_))));
        assert_eq!(fake.backend.primary().snapshot().len(), 1);
        assert!(!overrides.is_active());
    }
}
