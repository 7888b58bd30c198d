//! Security policy hook and process termination
//!
//! Sensitive operations ask the installed [`SecurityPolicy`] first. With no
//! policy installed every check passes. [`exit`] is the termination request
//! code under test calls instead of `std::process::exit`.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Decision points a security policy is consulted on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read a file
    FileRead {
        /// File path
        path: String,
    },

    /// Write a file
    FileWrite {
        /// File path
        path: String,
    },

    /// Delete a file
    FileDelete {
        /// File path
        path: String,
    },

    /// Spawn a process
    Exec {
        /// Command line
        command: String,
    },

    /// Load a native library
    LinkLibrary {
        /// Library name
        library: String,
    },

    /// Open an outbound connection
    Connect {
        /// Remote host
        host: String,
        /// Remote port, if known
        port: Option<u16>,
    },

    /// Listen on a local port
    Listen {
        /// Local port
        port: u16,
    },

    /// Accept an inbound connection
    Accept {
        /// Remote host
        host: String,
        /// Remote port
        port: u16,
    },

    /// Read or write one property
    PropertyAccess {
        /// Property key
        key: String,
    },

    /// Read or replace the whole property table
    PropertiesAccess,

    /// Read or write environment variables
    EnvironmentAccess {
        /// Variable name, or `None` for the whole environment
        name: Option<String>,
    },

    /// Modify another thread
    ThreadAccess {
        /// Thread name, if any
        thread: Option<String>,
    },

    /// Install a process-wide factory
    SetFactory,

    /// Change security configuration
    SecurityAccess {
        /// Target of the change
        target: String,
    },

    /// Terminate the process
    Exit {
        /// Requested exit status
        status: i32,
    },

    /// Application-defined permission
    Custom {
        /// Permission name
        name: String,
        /// Requested action
        action: Option<String>,
    },
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileRead { path } => write!(f, "read file {path}"),
            Self::FileWrite { path } => write!(f, "write file {path}"),
            Self::FileDelete { path } => write!(f, "delete file {path}"),
            Self::Exec { command } => write!(f, "execute {command}"),
            Self::LinkLibrary { library } => write!(f, "link library {library}"),
            Self::Connect { host, port: Some(port) } => write!(f, "connect to {host}:{port}"),
            Self::Connect { host, port: None } => write!(f, "connect to {host}"),
            Self::Listen { port } => write!(f, "listen on port {port}"),
            Self::Accept { host, port } => write!(f, "accept from {host}:{port}"),
            Self::PropertyAccess { key } => write!(f, "access property {key}"),
            Self::PropertiesAccess => f.write_str("access properties"),
            Self::EnvironmentAccess { name: Some(name) } => write!(f, "access environment variable {name}"),
            Self::EnvironmentAccess { name: None } => f.write_str("access environment"),
            Self::ThreadAccess { thread: Some(thread) } => write!(f, "access thread {thread}"),
            Self::ThreadAccess { thread: None } => f.write_str("access thread"),
            Self::SetFactory => f.write_str("set factory"),
            Self::SecurityAccess { target } => write!(f, "security access {target}"),
            Self::Exit { status } => write!(f, "exit with status {status}"),
            Self::Custom { name, action: Some(action) } => write!(f, "{name} ({action})"),
            Self::Custom { name, action: None } => f.write_str(name),
        }
    }
}

/// Permission denied by a security policy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("permission denied: {permission}: {reason}")]
pub struct PolicyViolation {
    /// Denied permission
    pub permission: Permission,
    /// Reason given by the policy
    pub reason: String,
}

impl PolicyViolation {
    /// Create violation
    pub fn new(permission: Permission, reason: impl Into<String>) -> Self {
        Self {
            permission,
            reason: reason.into(),
        }
    }
}

/// Process-wide security decision hook
pub trait SecurityPolicy: Send + Sync + fmt::Debug {
    /// Decide on a permission
    ///
    /// # Errors
    /// Returns error if the permission is denied
    fn check_permission(&self, permission: &Permission) -> Result<(), PolicyViolation>;

    /// Decide on a termination request
    ///
    /// # Errors
    /// Returns error if termination is denied
    fn check_exit(&self, status: i32) -> Result<(), PolicyViolation> {
        self.check_permission(&Permission::Exit { status })
    }

    /// Whether a check is currently in progress
    fn in_check(&self) -> bool {
        false
    }

    /// Opaque description of the current security context
    fn context(&self) -> Option<String> {
        None
    }

    /// Group that new threads should be assigned to
    fn thread_group(&self) -> Option<String> {
        None
    }
}

static POLICY: Lazy<RwLock<Option<Arc<dyn SecurityPolicy>>>> = Lazy::new(|| RwLock::new(None));

/// Installed security policy
#[must_use]
pub fn security_policy() -> Option<Arc<dyn SecurityPolicy>> {
    POLICY.read().clone()
}

/// Install or remove the security policy, returning the previous one
pub fn set_security_policy(
    policy: Option<Arc<dyn SecurityPolicy>>,
) -> Option<Arc<dyn SecurityPolicy>> {
    std::mem::replace(&mut *POLICY.write(), policy)
}

/// Ask the installed policy about a permission
///
/// # Errors
/// Returns error if the installed policy denies the permission
pub fn check_permission(permission: &Permission) -> Result<(), PolicyViolation> {
    match security_policy() {
        Some(policy) => policy.check_permission(permission),
        None => Ok(()),
    }
}

/// Request process termination
///
/// The installed policy is asked first. A denial unwinds the calling thread
/// with the [`PolicyViolation`] as panic payload; a policy may also unwind
/// on its own. Otherwise the process exits with `status`.
pub fn exit(status: i32) -> ! {
    if let Some(policy) = security_policy() {
        if let Err(violation) = policy.check_exit(status) {
            tracing::debug!(status, %violation, "exit denied by security policy");
            std::panic::panic_any(violation);
        }
    }
    tracing::debug!(status, "terminating process");
    std::process::exit(status)
}
