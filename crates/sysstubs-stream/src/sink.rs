//! Replacement sinks for the output channels
//!
//! - [`DiscardSink`] drops everything
//! - [`RejectSink`] fails every write and remembers the first offender
//! - [`TapSink`] captures bytes
//! - [`LineSink`] captures complete lines
//! - [`LogSink`] forwards to the original sink and optionally captures

use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sysstubs_core::ambient::{Channel, Sink};
use sysstubs_core::{text, ScopeError};

/// Sink that accepts and drops every write
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn write_all(&self, _buf: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that refuses every non-empty write
///
/// The first refused character is recorded; sinks created with
/// [`RejectSink::for_channel`] share that record.
#[derive(Debug, Clone)]
pub struct RejectSink {
    channel: Channel,
    first: Arc<Mutex<Option<ScopeError>>>,
}

impl RejectSink {
    /// Create sink for channel
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            first: Arc::default(),
        }
    }

    /// Sink for another channel sharing this sink's record
    #[must_use]
    pub fn for_channel(&self, channel: Channel) -> Self {
        Self {
            channel,
            first: Arc::clone(&self.first),
        }
    }

    /// First refused write, if any
    #[must_use]
    pub fn violation(&self) -> Option<ScopeError> {
        self.first.lock().clone()
    }
}

impl Sink for RejectSink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let Some(character) = text::decode(buf).chars().next() else {
            return Ok(());
        };
        let violation = ScopeError::UnexpectedWrite {
            channel: self.channel,
            character,
        };
        self.first.lock().get_or_insert_with(|| violation.clone());
        tracing::debug!(channel = %self.channel, %character, "rejected write");
        Err(io::Error::new(io::ErrorKind::PermissionDenied, violation))
    }
}

/// Sink capturing every byte written
#[derive(Debug, Default)]
pub struct TapSink {
    buffer: Mutex<Vec<u8>>,
}

impl TapSink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured bytes
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Captured bytes decoded with the current encoding
    #[must_use]
    pub fn text(&self) -> String {
        text::decode(&self.buffer.lock())
    }

    /// Captured text with every line separator replaced by `\n`
    #[must_use]
    pub fn text_normalized(&self) -> String {
        text::normalize_line_separators(&self.text())
    }

    /// Drop captured bytes
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Sink for TapSink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        tracing::trace!(bytes = buf.len(), "captured write");
        self.buffer.lock().extend_from_slice(buf);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LineState {
    pending: Vec<u8>,
    lines: Vec<String>,
}

/// Sink splitting output into lines
///
/// A line ends at the line separator that is current when the bytes
/// completing it are written.
#[derive(Debug, Default)]
pub struct LineSink {
    state: Mutex<LineState>,
}

impl LineSink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines completed so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.state.lock().lines.clone()
    }

    /// Completed lines plus a non-empty unterminated tail
    #[must_use]
    pub fn finish(&self) -> Vec<String> {
        let mut state = self.state.lock();
        let mut lines = std::mem::take(&mut state.lines);
        let pending = std::mem::take(&mut state.pending);
        if !pending.is_empty() {
            lines.push(text::decode(&pending));
        }
        lines
    }
}

impl Sink for LineSink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let separator = text::line_separator_bytes();
        let mut state = self.state.lock();
        state.pending.extend_from_slice(buf);
        if separator.is_empty() {
            return Ok(());
        }
        while let Some(at) = find(&state.pending, &separator) {
            let line: Vec<u8> = state.pending.drain(..at + separator.len()).collect();
            let line = text::decode(&line[..at]);
            state.lines.push(line);
        }
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Capture buffer shared between a [`LogSink`] and its owner
#[derive(Debug, Default)]
pub struct LogBuffer {
    enabled: AtomicBool,
    bytes: Mutex<Vec<u8>>,
}

impl LogBuffer {
    /// Create disabled buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or stop capturing
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether writes are being captured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Captured bytes
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Drop captured bytes
    pub fn clear(&self) {
        self.bytes.lock().clear();
    }

    fn record(&self, buf: &[u8]) {
        if self.is_enabled() {
            self.bytes.lock().extend_from_slice(buf);
        }
    }
}

/// Sink forwarding to the original sink while feeding a [`LogBuffer`]
#[derive(Debug)]
pub struct LogSink {
    original: Arc<dyn Sink>,
    buffer: Arc<LogBuffer>,
}

impl LogSink {
    /// Create sink in front of `original`
    #[must_use]
    pub fn new(original: Arc<dyn Sink>, buffer: Arc<LogBuffer>) -> Self {
        Self { original, buffer }
    }
}

impl Sink for LogSink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.original.write_all(buf)?;
        self.buffer.record(buf);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        self.original.flush()
    }
}
