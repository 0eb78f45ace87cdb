//! Config sync: the per-cycle pull of subscribers and poll bounds.
//!
//! The snapshot is re-derived from the record store every cycle so
//! operators can add subscribers, change webhooks, or retune cadence
//! without a restart. The sync never blocks a cycle on the store: a
//! failed subscriber load falls back to the previous in-memory
//! snapshot, a failed settings load falls back to hard-coded bounds.

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::models::Subscriber;
use crate::store::RecordStore;

/// Poll-interval bounds (seconds) used when the store's settings are
/// unreachable or malformed.
pub const FALLBACK_INTERVAL_BOUNDS: (f64, f64) = (30.0, 40.0);

/// One cycle's view of the subscriber list and poll bounds.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Non-expired subscribers only
    pub subscribers: Vec<Subscriber>,
    /// [min, max] inter-cycle delay in seconds
    pub interval_bounds: (f64, f64),
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            interval_bounds: FALLBACK_INTERVAL_BOUNDS,
        }
    }
}

impl Snapshot {
    /// Distinct course names any current subscriber wants watched.
    pub fn course_set(&self) -> BTreeSet<String> {
        self.subscribers
            .iter()
            .flat_map(|subscriber| subscriber.subscriptions.iter())
            .map(|subscription| subscription.course.clone())
            .collect()
    }
}

/// Pulls the current snapshot from the store, holding the previous one
/// as a fallback.
pub struct ConfigSync<'a> {
    store: &'a dyn RecordStore,
    last: Snapshot,
}

impl<'a> ConfigSync<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            last: Snapshot::default(),
        }
    }

    /// Load the current snapshot.
    ///
    /// Expired subscribers are excluded entirely for the cycle; their
    /// courses stay monitored only if another subscriber still wants
    /// them. Errors never propagate - see module docs for fallbacks.
    pub fn load(&mut self) -> Snapshot {
        match self.store.list_subscribers() {
            Ok(subscribers) => {
                let now = Utc::now();
                let mut active = Vec::with_capacity(subscribers.len());
                for subscriber in subscribers {
                    if subscriber.is_expired(now) {
                        debug!(
                            "excluding expired subscriber {} (stop instant {:?})",
                            subscriber.id, subscriber.stop_at
                        );
                    } else {
                        active.push(subscriber);
                    }
                }
                self.last.subscribers = active;
            }
            Err(e) => {
                warn!("failed to load subscribers, keeping previous snapshot: {e:#}");
            }
        }

        self.last.interval_bounds = match self.store.interval_bounds() {
            Ok((min, max)) if min > 0.0 && min <= max => (min, max),
            Ok((min, max)) => {
                warn!("ignoring malformed interval bounds [{min}, {max}]");
                FALLBACK_INTERVAL_BOUNDS
            }
            Err(e) => {
                warn!("failed to load interval bounds, using fallback: {e:#}");
                FALLBACK_INTERVAL_BOUNDS
            }
        };

        self.last.clone()
    }
}
