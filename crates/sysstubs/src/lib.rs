//! sysstubs - scoped stubbing of process-wide state for tests
//!
//! Every operation runs a unit of work with one piece of ambient state
//! replaced, and restores it afterwards whether the work succeeds, fails or
//! panics:
//! - Standard output and error: tap, mute, or forbid writes
//! - Standard input: serve fixed lines, then optionally fail
//! - Environment variables and the property table
//! - Process exit, intercepted and reported as a status
//!
//! Code under test reaches this state through [`ambient`] and the
//! [`sys_println!`] family of macros.
//!
//! # Example
//!
//! ```rust
//! use sysstubs::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let text = tap_system_out_normalized(|| {
//!     sys_println!("hello");
//!     Ok::<_, anyhow::Error>(())
//! })?;
//! assert_eq!(text, "hello\n");
//!
//! let status = catch_system_exit(|| -> anyhow::Result<()> { ambient::exit(3) })?;
//! assert_eq!(status, 3);
//! # Ok(())
//! # }
//! ```

pub mod output;

pub use output::{
    assert_nothing_written_to_system_err, assert_nothing_written_to_system_out,
    mute_system_err, mute_system_out, tap_system_err, tap_system_err_and_out,
    tap_system_err_and_out_normalized, tap_system_err_lines, tap_system_err_normalized,
    tap_system_out, tap_system_out_lines, tap_system_out_normalized,
};

pub use sysstubs_core::{
    ambient, config, execute_scoped, set_config, sys_eprint, sys_eprintln, sys_print,
    sys_println, Resources, ScopeError, ScopedMutation, StubsConfig,
};
pub use sysstubs_env::{restore_system_properties, EnvironmentVariables, SystemProperties};
pub use sysstubs_exit::{catch_system_exit, with_security_policy, NoExitPolicy};
pub use sysstubs_stream::{StreamLog, StreamTarget, SystemIn};

use sysstubs_core::ambient::Channel;
use sysstubs_env::IntoVarValue;

/// Overrides starting with one variable; chain more with
/// [`EnvironmentVariables::and`]
pub fn with_environment_variable(name: impl Into<String>, value: impl IntoVarValue) -> EnvironmentVariables {
    EnvironmentVariables::with(name, value)
}

/// Input serving `lines`, each terminated by the current line separator
pub fn with_text_from_system_in<I, S>(lines: I) -> SystemIn
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    SystemIn::with_lines(lines)
}

/// Muted log of standard output
#[must_use]
pub fn system_out_log() -> StreamLog {
    StreamLog::new(Channel::Out)
}

/// Muted log of standard error
#[must_use]
pub fn system_err_log() -> StreamLog {
    StreamLog::new(Channel::Err)
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing tests against ambient state
    pub use crate::{
        ambient, assert_nothing_written_to_system_err, assert_nothing_written_to_system_out,
        catch_system_exit, mute_system_err, mute_system_out, restore_system_properties,
        sys_eprint, sys_eprintln, sys_print, sys_println, system_err_log, system_out_log,
        tap_system_err, tap_system_err_and_out, tap_system_err_and_out_normalized,
        tap_system_err_lines, tap_system_err_normalized, tap_system_out, tap_system_out_lines,
        tap_system_out_normalized, with_environment_variable, with_security_policy,
        with_text_from_system_in, EnvironmentVariables, Resources, ScopeError, StreamLog,
        SystemIn, SystemProperties,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
