//! Process-wide property table
//!
//! A string-keyed table of platform settings. The live table is shared as an
//! `Arc<Properties>`; a scope that wants to restore it later keeps the `Arc`
//! it found and reinstalls that exact object.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Key of the line separator property
pub const LINE_SEPARATOR: &str = "line.separator";

/// Key of the default text encoding property
pub const FILE_ENCODING: &str = "file.encoding";

/// Key of the path component separator property
pub const FILE_SEPARATOR: &str = "file.separator";

/// Key of the search-path separator property
pub const PATH_SEPARATOR: &str = "path.separator";

/// Key of the operating system name property
pub const OS_NAME: &str = "os.name";

/// Key of the CPU architecture property
pub const OS_ARCH: &str = "os.arch";

/// Mutable string table with interior locking
#[derive(Debug, Default)]
pub struct Properties {
    entries: Mutex<IndexMap<String, String>>,
}

impl Properties {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the platform defaults
    #[must_use]
    pub fn platform() -> Self {
        let table = Self::new();
        table.set(LINE_SEPARATOR, crate::text::PLATFORM_LINE_SEPARATOR);
        table.set(FILE_ENCODING, "UTF-8");
        table.set(FILE_SEPARATOR, std::path::MAIN_SEPARATOR.to_string());
        table.set(PATH_SEPARATOR, if cfg!(windows) { ";" } else { ":" });
        table.set(OS_NAME, std::env::consts::OS);
        table.set(OS_ARCH, std::env::consts::ARCH);
        table
    }

    /// Look up a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Set a value, returning the previous one
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.lock().insert(key.into(), value.into())
    }

    /// Remove a value, returning it
    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().shift_remove(key)
    }

    /// Check if key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Independent copy of the current contents
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            entries: Mutex::new(self.entries.lock().clone()),
        }
    }

    /// All entries in insertion order
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

static PROPERTIES: Lazy<RwLock<Arc<Properties>>> =
    Lazy::new(|| RwLock::new(Arc::new(Properties::platform())));

/// Live property table
#[must_use]
pub fn properties() -> Arc<Properties> {
    Arc::clone(&PROPERTIES.read())
}

/// Install a property table, returning the one it replaced
pub fn set_properties(table: Arc<Properties>) -> Arc<Properties> {
    std::mem::replace(&mut *PROPERTIES.write(), table)
}

/// Look up a property in the live table
#[must_use]
pub fn property(key: &str) -> Option<String> {
    properties().get(key)
}

/// Set a property in the live table, returning the previous value
pub fn set_property(key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    properties().set(key, value)
}

/// Remove a property from the live table, returning it
pub fn clear_property(key: &str) -> Option<String> {
    properties().remove(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn platform_defaults() {
        let table = Properties::platform();
        assert_eq!(table.get(FILE_ENCODING).as_deref(), Some("UTF-8"));
        assert_eq!(
            table.get(LINE_SEPARATOR).as_deref(),
            Some(crate::text::PLATFORM_LINE_SEPARATOR)
        );
        assert!(table.contains(OS_NAME));
        assert!(table.contains(OS_ARCH));
    }

    #[test]
    fn copy_is_independent() {
        let table = Properties::new();
        table.set("a", "1");
        let copy = table.copy();
        copy.set("a", "2");
        copy.set("b", "3");
        assert_eq!(table.get("a").as_deref(), Some("1"));
        assert!(!table.contains("b"));
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn set_and_remove_return_previous() {
        let table = Properties::new();
        assert_eq!(table.set("k", "v1"), None);
        assert_eq!(table.set("k", "v2").as_deref(), Some("v1"));
        assert_eq!(table.remove("k").as_deref(), Some("v2"));
        assert!(table.is_empty());
    }

    #[test]
    #[serial]
    fn swapping_the_live_table() {
        let replacement = Arc::new(Properties::new());
        replacement.set("only.here", "yes");
        let original = set_properties(Arc::clone(&replacement));

        assert_eq!(property("only.here").as_deref(), Some("yes"));
        assert_eq!(property(FILE_ENCODING), None);

        let removed = set_properties(Arc::clone(&original));
        assert!(Arc::ptr_eq(&removed, &replacement));
        assert!(Arc::ptr_eq(&properties(), &original));
    }
}
