//! One-call output operations

use sysstubs_core::ScopeError;
use sysstubs_stream::{discard, reject, tap, tap_lines, tap_normalized, StreamTarget};

/// Fail if `work` writes anything to standard output
///
/// # Errors
/// Returns [`ScopeError::UnexpectedWrite`] naming the first character
/// written, the work's error, or a scope failure
pub fn assert_nothing_written_to_system_out<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    reject(StreamTarget::Out, work)
}

/// Fail if `work` writes anything to standard error
///
/// # Errors
/// Returns [`ScopeError::UnexpectedWrite`] naming the first character
/// written, the work's error, or a scope failure
pub fn assert_nothing_written_to_system_err<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    reject(StreamTarget::Err, work)
}

/// Run `work` with standard output discarded
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn mute_system_out<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    discard(StreamTarget::Out, work)
}

/// Run `work` with standard error discarded
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn mute_system_err<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    discard(StreamTarget::Err, work)
}

/// Text written to standard output by `work`
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_out<E, F>(work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap(StreamTarget::Out, work)
}

/// Text written to standard output by `work`, with `\n` line endings
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_out_normalized<E, F>(work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap_normalized(StreamTarget::Out, work)
}

/// Text written to standard error by `work`
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_err<E, F>(work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap(StreamTarget::Err, work)
}

/// Text written to standard error by `work`, with `\n` line endings
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_err_normalized<E, F>(work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap_normalized(StreamTarget::Err, work)
}

/// Text written to either channel by `work`, in write order
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_err_and_out<E, F>(work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap(StreamTarget::Both, work)
}

/// Text written to either channel by `work`, with `\n` line endings
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_err_and_out_normalized<E, F>(work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap_normalized(StreamTarget::Both, work)
}

/// Lines written to standard output by `work`
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_out_lines<E, F>(work: F) -> Result<Vec<String>, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap_lines(StreamTarget::Out, work)
}

/// Lines written to standard error by `work`
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_system_err_lines<E, F>(work: F) -> Result<Vec<String>, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap_lines(StreamTarget::Err, work)
}
