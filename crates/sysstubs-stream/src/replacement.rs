//! Scoped replacement of an output channel

use std::sync::Arc;
use sysstubs_core::ambient::{self, Channel, Sink};
use sysstubs_core::{Resources, ScopeError, ScopedMutation};

/// Which channels an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTarget {
    /// Standard output only
    Out,

    /// Standard error only
    Err,

    /// Both channels, sharing one sink
    Both,
}

impl StreamTarget {
    /// Channels in the order they are replaced
    ///
    /// `Both` replaces stderr first so that stdout is restored first.
    #[must_use]
    pub fn channels(self) -> &'static [Channel] {
        match self {
            Self::Out => &[Channel::Out],
            Self::Err => &[Channel::Err],
            Self::Both => &[Channel::Err, Channel::Out],
        }
    }
}

impl From<Channel> for StreamTarget {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Out => Self::Out,
            Channel::Err => Self::Err,
        }
    }
}

/// Installs a sink in one channel and reinstalls the original on leave
#[derive(Debug)]
pub struct OutputReplacement {
    channel: Channel,
    replacement: Arc<dyn Sink>,
    original: Option<Arc<dyn Sink>>,
}

impl OutputReplacement {
    /// Create replacement
    #[must_use]
    pub fn new(channel: Channel, replacement: Arc<dyn Sink>) -> Self {
        Self {
            channel,
            replacement,
            original: None,
        }
    }

    /// Channel being replaced
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Run `work` with the replacement installed
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

impl ScopedMutation for OutputReplacement {
    fn name(&self) -> &'static str {
        match self.channel {
            Channel::Out => "stdout replacement",
            Channel::Err => "stderr replacement",
        }
    }

    fn enter(&mut self) -> Result<(), ScopeError> {
        if self.original.is_some() {
            return Err(ScopeError::AlreadyActive(self.name()));
        }
        self.original = Some(ambient::set_sink(self.channel, Arc::clone(&self.replacement)));
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScopeError> {
        if let Some(original) = self.original.take() {
            ambient::set_sink(self.channel, original);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.original.is_some()
    }
}

/// Run `work` with `sink` installed in every channel of `target`
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn with_sink<T, E, F>(target: StreamTarget, sink: &Arc<dyn Sink>, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    let mut replacements: Vec<OutputReplacement> = target
        .channels()
        .iter()
        .map(|&channel| OutputReplacement::new(channel, Arc::clone(sink)))
        .collect();
    with_replacements(&mut replacements, work)
}

/// Run `work` inside a list of replacements, entered in list order
///
/// # Errors
/// Returns the work's error or a scope failure
pub fn with_replacements<T, E, F>(replacements: &mut [OutputReplacement], work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<ScopeError>,
{
    replacements
        .iter_mut()
        .fold(Resources::new(), |resources, replacement| resources.with(replacement))
        .execute(work)
}
