//! One-call output scopes: tap, mute and reject

use crate::replacement::{with_replacements, with_sink, OutputReplacement, StreamTarget};
use crate::sink::{DiscardSink, LineSink, RejectSink, TapSink};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use sysstubs_core::ambient::Sink;
use sysstubs_core::{text, ScopeError};

/// Capture everything written to `target` while `work` runs
///
/// With [`StreamTarget::Both`] a single buffer receives both channels in
/// write order. The result is decoded with the current `file.encoding`.
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap<E, F>(target: StreamTarget, work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    let tap = Arc::new(TapSink::new());
    let sink: Arc<dyn Sink> = tap.clone();
    with_sink(target, &sink, work)?;
    Ok(tap.text())
}

/// Like [`tap`], with every line separator replaced by `\n`
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_normalized<E, F>(target: StreamTarget, work: F) -> Result<String, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    tap(target, work).map(|captured| text::normalize_line_separators(&captured))
}

/// Capture output as lines; an unterminated tail counts as a last line
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn tap_lines<E, F>(target: StreamTarget, work: F) -> Result<Vec<String>, E>
where
    F: FnOnce() -> Result<(), E>,
    E: From<ScopeError>,
{
    let lines = Arc::new(LineSink::new());
    let sink: Arc<dyn Sink> = lines.clone();
    with_sink(target, &sink, work)?;
    Ok(lines.finish())
}

/// Drop everything written to `target` while `work` runs
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn discard<T, E, F>(target: StreamTarget, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    let sink: Arc<dyn Sink> = Arc::new(DiscardSink);
    with_sink(target, &sink, work)
}

/// Fail if anything is written to `target` while `work` runs
///
/// Every write is refused, so the writing code sees an error (the `sys_print!`
/// macros panic on it). Once the channels are restored, a refused write is
/// reported as [`ScopeError::UnexpectedWrite`] naming the first character,
/// whatever the work did afterwards. Panics unrelated to a refused write keep
/// unwinding.
///
/// # Errors
/// Returns [`ScopeError::UnexpectedWrite`], the work's error, or a scope
/// failure
pub fn reject<T, E, F>(target: StreamTarget, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    let channels = target.channels();
    let record = RejectSink::new(channels[0]);
    let mut replacements: Vec<OutputReplacement> = channels
        .iter()
        .map(|&channel| OutputReplacement::new(channel, Arc::new(record.for_channel(channel))))
        .collect();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| with_replacements(&mut replacements, work)));

    if let Some(violation) = record.violation() {
        tracing::debug!(error = %violation, "output rejected");
        return Err(violation.into());
    }
    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}
