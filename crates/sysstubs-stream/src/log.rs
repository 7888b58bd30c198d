//! Reusable log of a channel's output
//!
//! A [`StreamLog`] leaves output flowing to the original sink and keeps a
//! copy of what was written while logging is enabled. The log starts muted
//! and can be inspected from inside the work.

use crate::replacement::OutputReplacement;
use crate::sink::{LogBuffer, LogSink};
use std::sync::Arc;
use sysstubs_core::ambient::{self, Channel};
use sysstubs_core::{text, ScopeError};

/// Log of one output channel
#[derive(Debug)]
pub struct StreamLog {
    channel: Channel,
    buffer: Arc<LogBuffer>,
}

impl StreamLog {
    /// Create muted log for channel
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            buffer: Arc::new(LogBuffer::new()),
        }
    }

    /// Channel being logged
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Start capturing
    pub fn enable_log(&self) -> &Self {
        self.buffer.set_enabled(true);
        self
    }

    /// Stop capturing; captured text is kept
    pub fn mute_log(&self) -> &Self {
        self.buffer.set_enabled(false);
        self
    }

    /// Whether writes are being captured
    #[must_use]
    pub fn is_log_enabled(&self) -> bool {
        self.buffer.is_enabled()
    }

    /// Drop captured text
    pub fn clear_log(&self) {
        self.buffer.clear();
    }

    /// Captured text, decoded with the current encoding
    #[must_use]
    pub fn log(&self) -> String {
        text::decode(&self.buffer.bytes())
    }

    /// Captured text with every line separator replaced by `\n`
    #[must_use]
    pub fn log_with_normalized_line_separator(&self) -> String {
        text::normalize_line_separators(&self.log())
    }

    /// Run `work` with the channel routed through the log
    ///
    /// # Errors
    /// Returns the work's error or a scope failure
    pub fn execute<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<ScopeError>,
    {
        let sink = LogSink::new(ambient::sink(self.channel), Arc::clone(&self.buffer));
        OutputReplacement::new(self.channel, Arc::new(sink)).execute(work)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::TapSink;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use sysstubs_core::ambient::Sink;
    use sysstubs_core::sys_print;

    #[test]
    #[serial]
    fn muted_by_default_and_forwards() {
        let downstream = Arc::new(TapSink::new());
        let previous = ambient::set_sink(Channel::Out, downstream.clone() as Arc<dyn Sink>);

        let log = StreamLog::new(Channel::Out);
        log.execute(|| {
            sys_print!("before ");
            log.enable_log();
            sys_print!("during ");
            log.mute_log();
            sys_print!("after");
            Ok::<_, ScopeError>(())
        })
        .unwrap();

        let restored = ambient::set_sink(Channel::Out, previous);
        assert!(Arc::ptr_eq(&restored, &(downstream.clone() as Arc<dyn Sink>)));
        assert_eq!(downstream.text(), "before during after");
        assert_eq!(log.log(), "during ");
    }

    #[test]
    #[serial]
    fn clear_and_inspect_inside_work() {
        let downstream: Arc<dyn Sink> = Arc::new(TapSink::new());
        let previous = ambient::set_sink(Channel::Err, downstream);

        let log = StreamLog::new(Channel::Err);
        log.enable_log()
            .execute(|| {
                sysstubs_core::sys_eprint!("noise");
                log.clear_log();
                sysstubs_core::sys_eprint!("signal");
                assert_eq!(log.log(), "signal");
                Ok::<_, ScopeError>(())
            })
            .unwrap();

        ambient::set_sink(Channel::Err, previous);
        assert!(log.is_log_enabled());
        assert_eq!(log.log(), "signal");
    }
}
