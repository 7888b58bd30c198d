//! sysstubs env - scoped environment and property overrides
//!
//! Provides:
//! - [`EnvironmentVariables`]: ordered overrides of environment variables
//! - [`SystemProperties`]: a throwaway copy of the property table

pub mod properties;
pub mod variables;

pub use properties::{restore_system_properties, SystemProperties};
pub use variables::{EnvironmentVariables, IntoVarValue};
