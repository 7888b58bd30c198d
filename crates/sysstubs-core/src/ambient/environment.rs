//! Environment variable backends
//!
//! The ambient environment is an [`EnvironmentBackend`]: a primary,
//! case-sensitive table plus an optional case-insensitive one (the layout a
//! Windows process keeps). The default backend is the real process
//! environment; tests may install an [`InMemoryEnvironment`] instead.

use crate::error::EnvironmentError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::Arc;

/// Name/value pairs in table order
pub type EnvSnapshot = IndexMap<String, String>;

/// Raw entries whose name or value is not UTF-8
pub type OpaqueEntries = Vec<(OsString, OsString)>;

/// One mutable environment table
pub trait EnvTable: Send + Sync + fmt::Debug {
    /// Look up a variable
    fn get(&self, name: &str) -> Option<String>;

    /// Set a variable
    ///
    /// # Errors
    /// Returns error if the name or value is not representable
    fn set(&self, name: &str, value: &str) -> Result<(), EnvironmentError>;

    /// Remove a variable; removing an absent variable succeeds
    ///
    /// # Errors
    /// Returns error if the name is not representable
    fn remove(&self, name: &str) -> Result<(), EnvironmentError>;

    /// Copy of every entry
    fn snapshot(&self) -> EnvSnapshot;

    /// Remove every entry
    ///
    /// # Errors
    /// Returns error if an entry cannot be removed
    fn clear(&self) -> Result<(), EnvironmentError> {
        for name in self.snapshot().keys() {
            self.remove(name)?;
        }
        Ok(())
    }

    /// Clear, then refill from a snapshot
    ///
    /// # Errors
    /// Returns error if clearing or any insertion fails
    fn replace_all(&self, snapshot: &EnvSnapshot) -> Result<(), EnvironmentError> {
        self.clear()?;
        for (name, value) in snapshot {
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Entries that [`EnvTable::snapshot`] cannot express as text
    fn opaque_entries(&self) -> OpaqueEntries {
        Vec::new()
    }

    /// Make the opaque entries exactly `entries`
    ///
    /// # Errors
    /// Returns error if an entry cannot be written back
    fn restore_opaque(&self, _entries: &OpaqueEntries) -> Result<(), EnvironmentError> {
        Ok(())
    }
}

/// The structures that make up a process environment
pub trait EnvironmentBackend: Send + Sync + fmt::Debug {
    /// Case-sensitive table
    fn primary(&self) -> &dyn EnvTable;

    /// Case-insensitive table, where the platform keeps one
    fn case_insensitive(&self) -> Option<&dyn EnvTable> {
        None
    }
}

fn validate_name(name: &str) -> Result<(), EnvironmentError> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(EnvironmentError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn validate_value(name: &str, value: &str) -> Result<(), EnvironmentError> {
    if value.contains('\0') {
        return Err(EnvironmentError::InvalidValue {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn validate_raw(name: &OsStr, value: &OsStr) -> Result<(), EnvironmentError> {
    let lossy = name.to_string_lossy();
    if lossy.is_empty() || lossy.contains('=') || lossy.contains('\0') {
        return Err(EnvironmentError::InvalidName(lossy.into_owned()));
    }
    if value.to_string_lossy().contains('\0') {
        return Err(EnvironmentError::InvalidValue {
            name: lossy.into_owned(),
        });
    }
    Ok(())
}

/// The real process environment
///
/// Entries whose name or value is not UTF-8 are left out of text snapshots
/// and survive [`EnvTable::clear`]; they are saved and put back verbatim
/// through [`EnvTable::opaque_entries`] and [`EnvTable::restore_opaque`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvTable for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        if validate_name(name).is_err() {
            return None;
        }
        std::env::var(name).ok()
    }

    fn set(&self, name: &str, value: &str) -> Result<(), EnvironmentError> {
        validate_name(name)?;
        validate_value(name, value)?;
        std::env::set_var(name, value);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), EnvironmentError> {
        validate_name(name)?;
        std::env::remove_var(name);
        Ok(())
    }

    fn snapshot(&self) -> EnvSnapshot {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    fn opaque_entries(&self) -> OpaqueEntries {
        std::env::vars_os()
            .filter(|(name, value)| name.to_str().is_none() || value.to_str().is_none())
            .collect()
    }

    fn restore_opaque(&self, entries: &OpaqueEntries) -> Result<(), EnvironmentError> {
        for (name, value) in self.opaque_entries() {
            let added = !entries.iter().any(|(saved, _)| *saved == name);
            if added && validate_raw(&name, &value).is_ok() {
                std::env::remove_var(&name);
            }
        }
        for (name, value) in entries {
            validate_raw(name, value)?;
            std::env::set_var(name, value);
        }
        Ok(())
    }
}

impl EnvironmentBackend for ProcessEnvironment {
    fn primary(&self) -> &dyn EnvTable {
        self
    }
}

/// In-memory table, optionally matching names case-insensitively
#[derive(Debug, Default)]
pub struct MemoryTable {
    fold_case: bool,
    // Keyed by the lookup form of the name; stores the name as last written.
    entries: Mutex<IndexMap<String, (String, String)>>,
}

impl MemoryTable {
    /// Case-sensitive table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table matching names without regard to case
    #[must_use]
    pub fn case_insensitive() -> Self {
        Self {
            fold_case: true,
            entries: Mutex::default(),
        }
    }

    fn key(&self, name: &str) -> String {
        if self.fold_case {
            name.to_uppercase()
        } else {
            name.to_string()
        }
    }
}

impl EnvTable for MemoryTable {
    fn get(&self, name: &str) -> Option<String> {
        self.entries
            .lock()
            .get(&self.key(name))
            .map(|(_, value)| value.clone())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), EnvironmentError> {
        validate_name(name)?;
        validate_value(name, value)?;
        self.entries
            .lock()
            .insert(self.key(name), (name.to_string(), value.to_string()));
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), EnvironmentError> {
        validate_name(name)?;
        self.entries.lock().shift_remove(&self.key(name));
        Ok(())
    }

    fn snapshot(&self) -> EnvSnapshot {
        self.entries
            .lock()
            .values()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn clear(&self) -> Result<(), EnvironmentError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Injectable environment backed by memory
#[derive(Debug, Default)]
pub struct InMemoryEnvironment {
    primary: MemoryTable,
    case_insensitive: Option<MemoryTable>,
}

impl InMemoryEnvironment {
    /// Environment with only the primary table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the case-insensitive table
    #[must_use]
    pub fn with_case_insensitive_table(mut self) -> Self {
        self.case_insensitive = Some(MemoryTable::case_insensitive());
        self
    }

    /// Seed a variable into every table
    ///
    /// # Errors
    /// Returns error if the name or value is not representable
    pub fn with_var(self, name: &str, value: &str) -> Result<Self, EnvironmentError> {
        self.primary.set(name, value)?;
        if let Some(table) = &self.case_insensitive {
            table.set(name, value)?;
        }
        Ok(self)
    }

    /// Case-insensitive table, if present
    #[must_use]
    pub fn case_insensitive_table(&self) -> Option<&MemoryTable> {
        self.case_insensitive.as_ref()
    }
}

impl EnvironmentBackend for InMemoryEnvironment {
    fn primary(&self) -> &dyn EnvTable {
        &self.primary
    }

    fn case_insensitive(&self) -> Option<&dyn EnvTable> {
        self.case_insensitive.as_ref().map(|t| t as &dyn EnvTable)
    }
}

static ENVIRONMENT: Lazy<RwLock<Arc<dyn EnvironmentBackend>>> =
    Lazy::new(|| RwLock::new(Arc::new(ProcessEnvironment)));

/// Current environment backend
#[must_use]
pub fn environment() -> Arc<dyn EnvironmentBackend> {
    Arc::clone(&ENVIRONMENT.read())
}

/// Install an environment backend, returning the one it replaced
pub fn set_environment(backend: Arc<dyn EnvironmentBackend>) -> Arc<dyn EnvironmentBackend> {
    std::mem::replace(&mut *ENVIRONMENT.write(), backend)
}

/// Look up a variable in the current environment
#[must_use]
pub fn var(name: &str) -> Option<String> {
    environment().primary().get(name)
}

/// All variables of the current environment
#[must_use]
pub fn vars() -> EnvSnapshot {
    environment().primary().snapshot()
}
