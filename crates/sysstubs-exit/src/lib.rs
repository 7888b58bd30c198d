//! sysstubs exit - exit interception and scoped security policies
//!
//! Code under test requests termination through
//! [`sysstubs_core::ambient::exit`]. Inside [`catch_system_exit`] that
//! request unwinds the calling thread instead of ending the process, and the
//! requested status is returned to the caller.

pub mod catch;
pub mod hook;
pub mod policy;
pub mod replacement;
pub mod signal;

pub use catch::catch_system_exit;
pub use hook::install_quiet_hook;
pub use policy::NoExitPolicy;
pub use replacement::{with_security_policy, PolicyReplacement};
pub use signal::{ExitSignal, PolicyId};
