//! Line separator and text encoding, as configured in the property table
//!
//! Both values are looked up at the moment of use, so a scope that changes
//! `line.separator` or `file.encoding` changes how captured bytes are
//! decoded and what counts as a line.

use crate::ambient::properties::{self, FILE_ENCODING, LINE_SEPARATOR};
use std::borrow::Cow;

/// Platform line separator used when the property is missing
#[cfg(windows)]
pub const PLATFORM_LINE_SEPARATOR: &str = "\r\n";

/// Platform line separator used when the property is missing
#[cfg(not(windows))]
pub const PLATFORM_LINE_SEPARATOR: &str = "\n";

/// Text encodings understood for capture and replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    /// UTF-8; invalid sequences decode to U+FFFD
    #[default]
    Utf8,

    /// ISO-8859-1, one byte per code point
    Latin1,

    /// 7-bit ASCII; bytes above 0x7F decode to U+FFFD
    Ascii,
}

impl TextEncoding {
    /// Resolve an encoding label, falling back to UTF-8 for unknown labels
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Self::Latin1,
            "US-ASCII" | "ASCII" => Self::Ascii,
            _ => Self::Utf8,
        }
    }

    /// Canonical label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "US-ASCII",
        }
    }

    /// Decode bytes into text
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        }
    }

    /// Encode text into bytes; unmappable characters become `?`
    #[must_use]
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            Self::Utf8 => Cow::Borrowed(text.as_bytes()),
            Self::Latin1 => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect(),
            ),
            Self::Ascii => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b'?'))
                    .collect(),
            ),
        }
    }
}

/// Current line separator (`line.separator` property)
#[must_use]
pub fn line_separator() -> String {
    properties::property(LINE_SEPARATOR).unwrap_or_else(|| PLATFORM_LINE_SEPARATOR.to_string())
}

/// Current default encoding (`file.encoding` property)
#[must_use]
pub fn default_encoding() -> TextEncoding {
    properties::property(FILE_ENCODING)
        .map(|label| TextEncoding::from_label(&label))
        .unwrap_or_default()
}

/// Current line separator, encoded with the current default encoding
#[must_use]
pub fn line_separator_bytes() -> Vec<u8> {
    let separator = line_separator();
    default_encoding().encode(&separator).into_owned()
}

/// Decode with the current default encoding
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    default_encoding().decode(bytes)
}

/// Replace every current line separator with `\n`
#[must_use]
pub fn normalize_line_separators(text: &str) -> String {
    let separator = line_separator();
    if separator.is_empty() || separator == "\n" {
        return text.to_string();
    }
    text.replace(&separator, "\n")
}

/// Join lines, terminating each (including the last) with the separator
#[must_use]
pub fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let separator = line_separator();
    lines.into_iter().fold(String::new(), |mut text, line| {
        text.push_str(line.as_ref());
        text.push_str(&separator);
        text
    })
}
