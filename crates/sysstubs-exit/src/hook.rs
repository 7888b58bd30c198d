//! Panic hook filtering intercepted exit requests

use crate::signal::ExitSignal;
use once_cell::sync::OnceCell;
use std::panic;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the filtering hook, at most once per process
///
/// The hook stays silent for [`ExitSignal`] payloads while
/// `quiet_exit_signals` is configured and hands everything else to the hook
/// that was installed before it.
pub fn install_quiet_hook() {
    INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let quiet = sysstubs_core::config().quiet_exit_signals;
            if quiet && info.payload().is::<ExitSignal>() {
                return;
            }
            previous(info);
        }));
        tracing::debug!("quiet exit panic hook installed");
    });
}

/// Whether the filtering hook has been installed
#[must_use]
pub fn is_installed() -> bool {
    INSTALLED.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installing_twice_is_harmless() {
        install_quiet_hook();
        install_quiet_hook();
        assert!(is_installed());
    }
}
