//! Process-wide output channels
//!
//! Code under test writes through [`stdout`] / [`stderr`] (or the
//! `sys_print!` family of macros). Each channel is a slot holding the
//! current [`Sink`]; scopes swap the slot with [`set_sink`] and put the
//! previous sink back afterwards.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// One of the two ambient output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Standard output
    Out,

    /// Standard error
    Err,
}

impl Channel {
    /// Both channels, in declaration order
    pub const ALL: [Channel; 2] = [Channel::Out, Channel::Err];

    /// Conventional stream name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Out => "stdout",
            Channel::Err => "stderr",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write destination installed in an output channel
///
/// Sinks are shared (`Arc`) and written through `&self`, so one sink can sit
/// in both channels at once and receive writes in the order they happen.
pub trait Sink: Send + Sync + fmt::Debug {
    /// Write the whole buffer
    ///
    /// # Errors
    /// Returns error if the sink refuses or fails the write
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    ///
    /// # Errors
    /// Returns error if the underlying destination fails to flush
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink forwarding to the real process stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessStdout;

impl Sink for ProcessStdout {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Sink forwarding to the real process stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessStderr;

impl Sink for ProcessStderr {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}

static OUT: Lazy<RwLock<Arc<dyn Sink>>> = Lazy::new(|| RwLock::new(Arc::new(ProcessStdout)));
static ERR: Lazy<RwLock<Arc<dyn Sink>>> = Lazy::new(|| RwLock::new(Arc::new(ProcessStderr)));

fn slot(channel: Channel) -> &'static RwLock<Arc<dyn Sink>> {
    match channel {
        Channel::Out => &OUT,
        Channel::Err => &ERR,
    }
}

/// Current sink of a channel
#[must_use]
pub fn sink(channel: Channel) -> Arc<dyn Sink> {
    Arc::clone(&slot(channel).read())
}

/// Install a sink, returning the one it replaced
pub fn set_sink(channel: Channel, sink: Arc<dyn Sink>) -> Arc<dyn Sink> {
    std::mem::replace(&mut *slot(channel).write(), sink)
}

/// Writer for the ambient stdout
#[inline]
#[must_use]
pub fn stdout() -> ChannelWriter {
    ChannelWriter::new(Channel::Out)
}

/// Writer for the ambient stderr
#[inline]
#[must_use]
pub fn stderr() -> ChannelWriter {
    ChannelWriter::new(Channel::Err)
}

/// `io::Write` handle bound to a channel, not to a sink
///
/// The current sink is resolved on every call, so a writer obtained before a
/// scope started still writes into the scope's replacement.
#[derive(Debug, Clone, Copy)]
pub struct ChannelWriter {
    channel: Channel,
}

impl ChannelWriter {
    /// Create writer for channel
    #[inline]
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Channel this writer targets
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Clone out of the slot so the lock is not held while the sink runs;
        // forwarding sinks may write into the other channel.
        sink(self.channel).write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        sink(self.channel).flush()
    }
}

/// Format into a channel, panicking if the write fails
///
/// Backs the `sys_print!` macros, which behave like their `std` counterparts.
#[doc(hidden)]
pub fn print_to(channel: Channel, args: fmt::Arguments<'_>) {
    if let Err(e) = ChannelWriter::new(channel).write_fmt(args) {
        panic!("failed printing to {channel}: {e}");
    }
}

/// Print to the ambient stdout
#[macro_export]
macro_rules! sys_print {
    ($($arg:tt)*) => {
        $crate::ambient::channel::print_to(
            $crate::ambient::channel::Channel::Out,
            ::std::format_args!($($arg)*),
        )
    };
}

/// Print a line to the ambient stdout
///
/// The terminator is the current `line.separator` property.
#[macro_export]
macro_rules! sys_println {
    () => {
        $crate::sys_print!("{}", $crate::text::line_separator())
    };
    ($($arg:tt)*) => {
        $crate::sys_print!("{}{}", ::std::format_args!($($arg)*), $crate::text::line_separator())
    };
}

/// Print to the ambient stderr
#[macro_export]
macro_rules! sys_eprint {
    ($($arg:tt)*) => {
        $crate::ambient::channel::print_to(
            $crate::ambient::channel::Channel::Err,
            ::std::format_args!($($arg)*),
        )
    };
}

/// Print a line to the ambient stderr
#[macro_export]
macro_rules! sys_eprintln {
    () => {
        $crate::sys_eprint!("{}", $crate::text::line_separator())
    };
    ($($arg:tt)*) => {
        $crate::sys_eprint!("{}{}", ::std::format_args!($($arg)*), $crate::text::line_separator())
    };
}
