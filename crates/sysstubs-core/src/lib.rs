//! sysstubs core - swappable ambient state
//!
//! The process-wide state that code under test touches:
//! - Output channels (stdout, stderr)
//! - Input channel (stdin)
//! - Environment variables
//! - Property table
//! - Security policy and process exit
//!
//! Each piece lives in a slot with an accessor and a mutator. Scopes built on
//! [`ScopedMutation`] swap a slot for the duration of a unit of work and put
//! the original back afterwards, even when the work fails or panics.
//!
//! # Example
//!
//! ```rust
//! use sysstubs_core::{sys_println, ambient::{self, Channel}};
//!
//! sys_println!("written to whatever sink is installed for {}", Channel::Out);
//! assert!(ambient::property("line.separator").is_some());
//! ```

// Core modules
pub mod ambient;
pub mod config;
pub mod error;
pub mod scope;
pub mod text;

// Re-exports for convenience
pub use ambient::{Channel, Permission, PolicyViolation, SecurityPolicy, Sink};
pub use config::{config, set_config, StubsConfig};
pub use error::{EnvironmentError, ErrorCategory, ScopeError, ScopeResult};
pub use scope::{execute_scoped, Resources, ScopedMutation};
pub use text::TextEncoding;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
