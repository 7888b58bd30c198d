//! Error types for scoped ambient mutations
//!
//! Provides the failure taxonomy shared by every scope:
//! - Usage errors (misconfiguration, reported at the point of misuse)
//! - Assertion-style failures (scope contract violated while work ran)
//! - Restoration failures (ambient state could not be put back)

use crate::ambient::channel::Channel;

/// Errors raised by an environment backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    /// Name is empty or contains `=` or NUL
    #[error("invalid environment variable name: '{0}'")]
    InvalidName(String),

    /// Value contains NUL
    #[error("invalid value for environment variable '{name}'")]
    InvalidValue {
        /// Variable whose value was rejected
        name: String,
    },

    /// Backend-specific failure
    #[error("environment backend failure: {0}")]
    Backend(String),
}

/// Broad category of a [`ScopeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Misconfiguration detected before any ambient mutation
    Usage,

    /// Scope contract violated while work was running
    Assertion,

    /// Ambient state could not be restored
    Restoration,
}

/// Failures produced by the scopes themselves
///
/// Errors raised by user work never become a `ScopeError`; they pass through
/// the scope unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// Environment override registered twice in one set
    #[error(
        "The environment variable '{name}' cannot be set to {} because it was already set to {}.",
        describe_value(.value),
        describe_value(.existing)
    )]
    DuplicateVariable {
        /// Variable name
        name: String,
        /// Value of the rejected registration
        value: Option<String>,
        /// Value already registered
        existing: Option<String>,
    },

    /// End-of-input failure configured twice
    #[error("You cannot call {attempted} because {configured} has already been called.")]
    InputFailureAlreadyConfigured {
        /// Builder call that was rejected
        attempted: &'static str,
        /// Builder call that configured the failure first
        configured: &'static str,
    },

    /// Buffer region outside the buffer
    #[error("buffer range out of bounds: offset {offset} + length {length} exceeds capacity {capacity}")]
    InvalidBufferRange {
        /// Requested start offset
        offset: usize,
        /// Requested length
        length: usize,
        /// Buffer capacity
        capacity: usize,
    },

    /// Mutation entered while already active
    #[error("{0} is already active")]
    AlreadyActive(&'static str),

    /// Environment backend rejected an operation
    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Write observed on a channel that forbids output
    #[error("Tried to write '{character}' although this is not allowed.")]
    UnexpectedWrite {
        /// Channel written to
        channel: Channel,
        /// First offending character
        character: char,
    },

    /// Exit interception finished without a termination request
    #[error("exit has not been called.")]
    ExitNotCalled,

    /// Restoration of ambient state failed
    #[error("failed to restore {resource}: {reason}")]
    RestoreFailed {
        /// Resource that failed to restore
        resource: &'static str,
        /// Underlying reason
        reason: String,
    },
}

impl ScopeError {
    /// Create restore failure for resource
    pub fn restore_failed(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::RestoreFailed {
            resource,
            reason: reason.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateVariable { .. }
            | Self::InputFailureAlreadyConfigured { .. }
            | Self::InvalidBufferRange { .. }
            | Self::AlreadyActive(_)
            | Self::Environment(_) => ErrorCategory::Usage,
            Self::UnexpectedWrite { .. } | Self::ExitNotCalled => ErrorCategory::Assertion,
            Self::RestoreFailed { .. } => ErrorCategory::Restoration,
        }
    }

    /// Check if error reports a violated scope contract
    #[inline]
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        self.category() == ErrorCategory::Assertion
    }
}

fn describe_value(value: &Option<String>) -> String {
    match value {
        Some(text) => format!("'{text}'"),
        None => "<unset>".to_string(),
    }
}

/// Result type alias for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;
