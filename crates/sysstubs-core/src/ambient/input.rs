//! Process-wide input channel

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::io::{self, Read};
use std::sync::Arc;

/// Shared, lockable byte source
pub type InputSource = Arc<Mutex<dyn Read + Send>>;

static SOURCE: Lazy<RwLock<InputSource>> = Lazy::new(|| RwLock::new(process_stdin()));

/// Source reading the real process stdin
#[must_use]
pub fn process_stdin() -> InputSource {
    Arc::new(Mutex::new(io::stdin()))
}

/// Wrap a reader as an input source
pub fn source_from<R: Read + Send + 'static>(reader: R) -> InputSource {
    Arc::new(Mutex::new(reader))
}

/// Current input source
#[must_use]
pub fn source() -> InputSource {
    Arc::clone(&SOURCE.read())
}

/// Install an input source, returning the one it replaced
pub fn set_source(source: InputSource) -> InputSource {
    std::mem::replace(&mut *SOURCE.write(), source)
}

/// Reader for the ambient stdin
#[inline]
#[must_use]
pub fn stdin() -> StdinReader {
    StdinReader
}

/// `io::Read` handle resolving the current source on every call
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinReader;

impl StdinReader {
    /// Read one line, including its `\n`, appending to `line`
    ///
    /// Bytes are pulled one at a time so nothing past the line is consumed.
    /// Returns the number of bytes read; `0` means end of input.
    ///
    /// # Errors
    /// Returns error if the source fails or the line is not valid UTF-8
    pub fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        let mut bytes = Vec::new();
        let mut byte = [0_u8; 1];
        loop {
            match self.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    bytes.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        let text = String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push_str(&text);
        Ok(text.len())
    }
}

impl Read for StdinReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let source = source();
        let mut guard = source.lock();
        guard.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Cursor;

    #[test]
    #[serial]
    fn reads_from_installed_source() {
        let previous = set_source(source_from(Cursor::new(b"first\nsecond".to_vec())));

        let mut reader = stdin();
        let mut line = String::new();
        assert_eq!(reader.read_line(&mut line).unwrap(), 6);
        assert_eq!(line, "first\n");

        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "second");

        set_source(previous);
    }

    #[test]
    #[serial]
    fn read_line_at_end_returns_zero() {
        let previous = set_source(source_from(Cursor::new(Vec::new())));
        let mut line = String::new();
        assert_eq!(stdin().read_line(&mut line).unwrap(), 0);
        assert!(line.is_empty());
        set_source(previous);
    }
}
