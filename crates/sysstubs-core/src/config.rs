//! Library-wide behaviour switches

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Environment variable overriding [`StubsConfig::quiet_exit_signals`]
pub const QUIET_EXIT_VAR: &str = "SYSSTUBS_QUIET_EXIT";

/// Environment variable overriding [`StubsConfig::strict_restore`]
pub const STRICT_RESTORE_VAR: &str = "SYSSTUBS_STRICT_RESTORE";

/// Behaviour switches shared by every scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubsConfig {
    /// Keep the panic hook silent for intercepted exit requests
    pub quiet_exit_signals: bool,
    /// Report restoration failures after successful work as errors
    pub strict_restore: bool,
}

impl StubsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With quiet exit signals
    #[inline]
    #[must_use]
    pub fn with_quiet_exit_signals(mut self, quiet: bool) -> Self {
        self.quiet_exit_signals = quiet;
        self
    }

    /// With strict restore
    #[inline]
    #[must_use]
    pub fn with_strict_restore(mut self, strict: bool) -> Self {
        self.strict_restore = strict;
        self
    }

    /// Defaults overridden by `SYSSTUBS_*` process variables
    ///
    /// Unrecognised values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by values from `lookup`
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(flag) = lookup(QUIET_EXIT_VAR).as_deref().and_then(parse_flag) {
            config.quiet_exit_signals = flag;
        }
        if let Some(flag) = lookup(STRICT_RESTORE_VAR).as_deref().and_then(parse_flag) {
            config.strict_restore = flag;
        }
        config
    }
}

impl Default for StubsConfig {
    fn default() -> Self {
        Self {
            quiet_exit_signals: true,
            strict_restore: true,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

static CONFIG: Lazy<RwLock<StubsConfig>> = Lazy::new(|| RwLock::new(StubsConfig::from_env()));

/// Current configuration
#[must_use]
pub fn config() -> StubsConfig {
    *CONFIG.read()
}

/// Replace the configuration, returning the previous one
pub fn set_config(config: StubsConfig) -> StubsConfig {
    std::mem::replace(&mut *CONFIG.write(), config)
}
