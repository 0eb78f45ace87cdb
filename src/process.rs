//! Cooperative shutdown flag and signal wiring.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Set-once/read-many shutdown flag shared between the monitor loop and
/// the presence reporter. The only state those threads share.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative shutdown. Idempotent.
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Install SIGINT/SIGTERM handling.
///
/// First signal sets the flag so loops exit at the next cycle boundary;
/// a second signal terminates the process immediately.
pub fn install_signal_handler(shutdown: ShutdownFlag) -> Result<()> {
    let mut already_requested = false;
    ctrlc::set_handler(move || {
        if already_requested {
            warn!("second shutdown signal received, forcing exit");
            std::process::exit(1);
        }
        already_requested = true;
        info!("shutdown requested, finishing current cycle");
        shutdown.set();
    })
    .context("Failed to install signal handler")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_clear() {
        assert!(!ShutdownFlag::new().is_set());
    }

    #[test]
    fn test_set_is_visible_to_clones() {
        let flag = ShutdownFlag::new();
        let clone = flag.clone();
        flag.set();
        assert!(clone.is_set());
    }

    #[test]
    fn test_set_is_idempotent() {
        let flag = ShutdownFlag::new();
        flag.set();
        flag.set();
        assert!(flag.is_set());
    }
}
