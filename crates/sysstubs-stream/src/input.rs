//! Simulated standard input
//!
//! [`SystemIn`] installs a [`ReplacementInput`] serving fixed text, with an
//! optional failure raised once the text is exhausted:
//! - an `io::Error` returned from the read, or
//! - a panic carrying a message

use std::fmt;
use std::io::{self, Read};
use sysstubs_core::ambient::{self, input::InputSource};
use sysstubs_core::{text, ScopeError, ScopedMutation};

const IO_ERROR_CALL: &str = "and_io_error_on_input_end";
const PANIC_CALL: &str = "and_panic_on_input_end";

/// Failure raised when input runs out
#[derive(Debug)]
pub enum EndOfInput {
    /// Return this error from the read
    IoError(io::Error),

    /// Panic with this message
    Panic(String),
}

impl EndOfInput {
    fn configured_by(&self) -> &'static str {
        match self {
            Self::IoError(_) => IO_ERROR_CALL,
            Self::Panic(_) => PANIC_CALL,
        }
    }
}

/// Byte source serving fixed content, then the configured failure
pub struct ReplacementInput {
    bytes: Vec<u8>,
    position: usize,
    failure: Option<EndOfInput>,
}

impl ReplacementInput {
    /// Create source over bytes
    #[must_use]
    pub fn new(bytes: Vec<u8>, failure: Option<EndOfInput>) -> Self {
        Self {
            bytes,
            position: 0,
            failure,
        }
    }

    /// Bytes not yet read
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Read one byte; `None` marks the end of input
    ///
    /// The first read past the end raises the configured failure; later
    /// reads just report the end.
    ///
    /// # Errors
    /// Returns the configured `io::Error` at the end of input
    ///
    /// # Panics
    /// Panics with the configured message at the end of input
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(&byte) = self.bytes.get(self.position) {
            self.position += 1;
            return Ok(Some(byte));
        }
        match self.failure.take() {
            None => Ok(None),
            Some(EndOfInput::IoError(err)) => {
                tracing::debug!(error = %err, "input exhausted, returning configured error");
                Err(err)
            }
            Some(EndOfInput::Panic(message)) => {
                tracing::debug!(%message, "input exhausted, panicking");
                std::panic::panic_any(message)
            }
        }
    }

    /// Read into `buf[offset..offset + length]`
    ///
    /// Stops when `length` bytes are copied, the content runs out, or a
    /// complete line separator has been copied. Returns `0` at the end of
    /// input. When content runs out part-way, the bytes copied so far are
    /// returned and any configured failure waits for the next read.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the region does not fit in `buf`, or the
    /// configured `io::Error` at the end of input
    pub fn read_region(&mut self, buf: &mut [u8], offset: usize, length: usize) -> io::Result<usize> {
        let capacity = buf.len();
        if offset.checked_add(length).map_or(true, |end| end > capacity) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                ScopeError::InvalidBufferRange {
                    offset,
                    length,
                    capacity,
                },
            ));
        }
        if length == 0 {
            return Ok(0);
        }

        let Some(first) = self.read_byte()? else {
            return Ok(0);
        };
        let separator = text::line_separator_bytes();
        let region = &mut buf[offset..offset + length];
        region[0] = first;
        let mut copied = 1;
        while copied < length && !ends_with_separator(&region[..copied], &separator) {
            if self.remaining() == 0 {
                break;
            }
            match self.read_byte()? {
                Some(byte) => {
                    region[copied] = byte;
                    copied += 1;
                }
                None => break,
            }
        }
        Ok(copied)
    }
}

fn ends_with_separator(written: &[u8], separator: &[u8]) -> bool {
    !separator.is_empty() && written.ends_with(separator)
}

impl Read for ReplacementInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let length = buf.len();
        self.read_region(buf, 0, length)
    }
}

impl fmt::Debug for ReplacementInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplacementInput")
            .field("len", &self.bytes.len())
            .field("position", &self.position)
            .field("failure", &self.failure)
            .finish()
    }
}

/// Scoped replacement of the input channel
pub struct SystemIn {
    text: String,
    failure: Option<EndOfInput>,
    original: Option<InputSource>,
}

impl SystemIn {
    /// Input made of `lines`, each terminated by the current line separator
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_text(text::join_lines(lines))
    }

    /// Input made of `text` as is
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failure: None,
            original: None,
        }
    }

    /// Return `error` from the first read after the text is exhausted
    ///
    /// # Errors
    /// Returns [`ScopeError::InputFailureAlreadyConfigured`] if an
    /// end-of-input failure is already configured
    pub fn and_io_error_on_input_end(self, error: io::Error) -> Result<Self, ScopeError> {
        self.configure(IO_ERROR_CALL, EndOfInput::IoError(error))
    }

    /// Panic with `message` on the first read after the text is exhausted
    ///
    /// # Errors
    /// Returns [`ScopeError::InputFailureAlreadyConfigured`] if an
    /// end-of-input failure is already configured
    pub fn and_panic_on_input_end(self, message: impl Into<String>) -> Result<Self, ScopeError> {
        self.configure(PANIC_CALL, EndOfInput::Panic(message.into()))
    }

    fn configure(mut self, attempted: &'static str, failure: EndOfInput) -> Result<Self, ScopeError> {
        if let Some(existing) = &self.failure {
            return Err(ScopeError::InputFailureAlreadyConfigured {
                attempted,
                configured: existing.configured_by(),
            });
        }
        self.failure = Some(failure);
        Ok(self)
    }

    /// Text served by the replacement
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Run `work` with the replacement input installed
    ///
    /// # Errors
    /// Returns the work's error or a scope failure
    pub fn execute<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<ScopeError>,
    {
        sysstubs_core::execute_scoped(self, work)
    }
}

impl fmt::Debug for SystemIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemIn")
            .field("text", &self.text)
            .field("failure", &self.failure)
            .field("active", &self.original.is_some())
            .finish()
    }
}

impl ScopedMutation for SystemIn {
    fn name(&self) -> &'static str {
        "stdin replacement"
    }

    fn enter(&mut self) -> Result<(), ScopeError> {
        if self.original.is_some() {
            return Err(ScopeError::AlreadyActive(self.name()));
        }
        let bytes = text::default_encoding().encode(&self.text).into_owned();
        let replacement = ReplacementInput::new(bytes, self.failure.take());
        self.original = Some(ambient::set_source(ambient::input::source_from(replacement)));
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScopeError> {
        if let Some(original) = self.original.take() {
            ambient::set_source(original);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.original.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::panic::{self, AssertUnwindSafe};

    fn input(text: &str) -> ReplacementInput {
        ReplacementInput::new(text.as_bytes().to_vec(), None)
    }

    #[test]
    fn byte_reads_then_end_marker() {
        let mut source = input("ab");
        assert_eq!(source.read_byte().unwrap(), Some(b'a'));
        assert_eq!(source.read_byte().unwrap(), Some(b'b'));
        assert_eq!(source.read_byte().unwrap(), None);
        assert_eq!(source.read_byte().unwrap(), None);
    }

    #[test]
    fn io_error_fires_once() {
        let mut source = ReplacementInput::new(
            Vec::new(),
            Some(EndOfInput::IoError(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))),
        );
        let err = source.read_byte().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(source.read_byte().unwrap(), None);
    }

    #[test]
    fn panic_carries_message() {
        let mut source = ReplacementInput::new(b"x".to_vec(), Some(EndOfInput::Panic("drained".into())));
        assert_eq!(source.read_byte().unwrap(), Some(b'x'));
        let payload = panic::catch_unwind(AssertUnwindSafe(|| source.read_byte())).unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("drained"));
    }

    #[test]
    fn region_bounds_are_checked() {
        let mut source = input("abc");
        let mut buf = [0_u8; 4];
        let err = source.read_region(&mut buf, 3, 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("offset 3 + length 2 exceeds capacity 4"));
        assert!(source.read_region(&mut buf, usize::MAX, 2).is_err());
        assert_eq!(source.remaining(), 3);
    }

    #[test]
    fn zero_length_reads_nothing() {
        let mut source = input("abc");
        let mut buf = [0_u8; 4];
        assert_eq!(source.read_region(&mut buf, 1, 0).unwrap(), 0);
        assert_eq!(source.remaining(), 3);
    }

    #[test]
    #[serial]
    fn region_read_stops_after_separator() {
        let previous = ambient::set_property("line.separator", "\n");
        let mut source = input("one\ntwo\n");
        let mut buf = [0_u8; 16];

        let first = source.read_region(&mut buf, 2, 10).unwrap();
        let second = source.read_region(&mut buf, 0, 10).unwrap();
        let end = source.read_region(&mut buf, 0, 10).unwrap();
        restore_separator(previous);

        assert_eq!(first, 4);
        assert_eq!(second, 4);
        assert_eq!(&buf[..4], b"two\n");
        assert_eq!(end, 0);
    }

    #[test]
    #[serial]
    fn partial_read_keeps_failure_pending() {
        let previous = ambient::set_property("line.separator", "\n");
        let mut source = ReplacementInput::new(
            b"tail".to_vec(),
            Some(EndOfInput::IoError(io::Error::new(io::ErrorKind::Other, "end"))),
        );
        let mut buf = [0_u8; 16];

        let read = source.read_region(&mut buf, 0, 16).unwrap();
        let next = source.read_region(&mut buf, 0, 16);
        restore_separator(previous);

        assert_eq!(read, 4);
        assert_eq!(&buf[..4], b"tail");
        assert_eq!(next.unwrap_err().to_string(), "end");
    }

    #[test]
    fn second_failure_configuration_is_rejected() {
        let err = SystemIn::from_text("x")
            .and_panic_on_input_end("first")
            .unwrap()
            .and_io_error_on_input_end(io::Error::new(io::ErrorKind::Other, "second"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You cannot call and_io_error_on_input_end because and_panic_on_input_end has already been called."
        );
    }

    #[test]
    #[serial]
    fn scope_installs_and_restores_source() {
        let original = ambient::source();
        let mut system_in = SystemIn::from_text("hello");

        let read = system_in
            .execute(|| -> anyhow::Result<String> {
                let mut text = String::new();
                ambient::stdin().read_to_string(&mut text)?;
                Ok(text)
            })
            .unwrap();

        assert_eq!(read, "hello");
        assert!(std::sync::Arc::ptr_eq(&ambient::source(), &original));
    }

    fn restore_separator(previous: Option<String>) {
        match previous {
            Some(separator) => ambient::set_property("line.separator", separator),
            None => ambient::clear_property("line.separator"),
        };
    }
}
