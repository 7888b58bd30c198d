//! sysstubs stream - scoped replacement of the standard streams
//!
//! Provides:
//! - Output capture ([`tap`], [`tap_normalized`], [`tap_lines`])
//! - Muting ([`discard`]) and write rejection ([`reject`])
//! - A reusable channel log ([`StreamLog`])
//! - Simulated input ([`SystemIn`])

pub mod capture;
pub mod input;
pub mod log;
pub mod replacement;
pub mod sink;

pub use capture::{discard, reject, tap, tap_lines, tap_normalized};
pub use input::{EndOfInput, ReplacementInput, SystemIn};
pub use log::StreamLog;
pub use replacement::{with_sink, OutputReplacement, StreamTarget};
pub use sink::{DiscardSink, LineSink, LogBuffer, LogSink, RejectSink, TapSink};
