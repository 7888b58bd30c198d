//! Testing utilities for sysstubs workspace
//!
//! Shared sinks, policies, guards and tracing setup.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use sysstubs_core::ambient::{
    self, Channel, EnvironmentBackend, InMemoryEnvironment, Permission, PolicyViolation,
    SecurityPolicy, Sink,
};
use tracing_subscriber::EnvFilter;

/// Variable read first by [`init_tracing`]
pub const LOG_ENV_VAR: &str = "SYSSTUBS_LOG";

/// Install a test-friendly tracing subscriber
///
/// The filter comes from `SYSSTUBS_LOG`, then `RUST_LOG`, then `warn`.
/// Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = std::env::var(LOG_ENV_VAR)
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "warn".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Sink collecting every byte written
#[derive(Debug, Default)]
pub struct RecordingSink {
    bytes: Mutex<Vec<u8>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl Sink for RecordingSink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(())
    }
}

/// Installs a sink in a channel until dropped
pub struct SinkGuard {
    channel: Channel,
    previous: Option<Arc<dyn Sink>>,
}

impl SinkGuard {
    pub fn install(channel: Channel, sink: Arc<dyn Sink>) -> Self {
        Self {
            channel,
            previous: Some(ambient::set_sink(channel, sink)),
        }
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            ambient::set_sink(self.channel, previous);
        }
    }
}

/// Security policy recording every decision it is asked for
#[derive(Debug, Default)]
pub struct RecordingPolicy {
    denied: Vec<Permission>,
    seen: Mutex<Vec<Permission>>,
}

impl RecordingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny this exact permission
    pub fn denying(mut self, permission: Permission) -> Self {
        self.denied.push(permission);
        self
    }

    pub fn seen(&self) -> Vec<Permission> {
        self.seen.lock().clone()
    }
}

impl SecurityPolicy for RecordingPolicy {
    fn check_permission(&self, permission: &Permission) -> Result<(), PolicyViolation> {
        self.seen.lock().push(permission.clone());
        if self.denied.contains(permission) {
            return Err(PolicyViolation::new(permission.clone(), "denied by recording policy"));
        }
        Ok(())
    }
}

/// Installs an in-memory environment until dropped
pub struct FakeEnvironment {
    backend: Arc<InMemoryEnvironment>,
    previous: Option<Arc<dyn EnvironmentBackend>>,
}

impl FakeEnvironment {
    pub fn install(backend: InMemoryEnvironment) -> Self {
        let backend = Arc::new(backend);
        let previous = ambient::set_environment(backend.clone());
        Self {
            backend,
            previous: Some(previous),
        }
    }

    pub fn backend(&self) -> &InMemoryEnvironment {
        &self.backend
    }
}

impl Drop for FakeEnvironment {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            ambient::set_environment(previous);
        }
    }
}

/// Sets one property in the live table until dropped
pub struct PropertyGuard {
    key: String,
    previous: Option<String>,
}

impl PropertyGuard {
    pub fn set(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            previous: ambient::set_property(key, value),
        }
    }

    /// Set `line.separator`
    pub fn line_separator(separator: &str) -> Self {
        Self::set("line.separator", separator)
    }
}

impl Drop for PropertyGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => ambient::set_property(self.key.clone(), value),
            None => ambient::clear_property(&self.key),
        };
    }
}

/// Work that fails with `message`
pub fn failing_work<T>(message: &'static str) -> impl FnOnce() -> anyhow::Result<T> {
    move || Err(anyhow::anyhow!(message))
}
