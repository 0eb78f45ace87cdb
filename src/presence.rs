//! Presence reporter: a background thread that periodically logs what
//! the process is watching. Read-only against the record store; it
//! never touches engine state.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::engine::clock::{sleep_interruptible, SystemClock};
use crate::process::ShutdownFlag;
use crate::store::RecordStore;

/// Spawn the presence thread. Returns its handle so the caller can join
/// it on shutdown.
pub fn spawn_presence(
    store: Arc<dyn RecordStore>,
    shutdown: ShutdownFlag,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let clock = SystemClock;
        while !shutdown.is_set() {
            match store.list_subscribers() {
                Ok(subscribers) => {
                    let courses: std::collections::BTreeSet<&str> = subscribers
                        .iter()
                        .flat_map(|subscriber| subscriber.subscriptions.iter())
                        .map(|sub| sub.course.as_str())
                        .collect();
                    info!(
                        "watching {} course(s) for {} subscriber(s)",
                        courses.len(),
                        subscribers.len()
                    );
                }
                Err(e) => warn!("presence report skipped: {e:#}"),
            }
            sleep_interruptible(&clock, &shutdown, interval, Duration::from_millis(250));
        }
    })
}
