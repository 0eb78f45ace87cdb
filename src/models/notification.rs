//! Notification kinds and the persisted ledger record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a notification was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// First sighting this run, and the seat count differs from the
    /// persisted record (or there is no record)
    Initial,
    /// Seats crossed 0 -> >0 within this run
    Available,
    /// Seats crossed >0 -> 0 within this run (including the section
    /// disappearing from both listings)
    Full,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Initial => write!(f, "initial"),
            NotificationKind::Available => write!(f, "available"),
            NotificationKind::Full => write!(f, "full"),
        }
    }
}

/// One row of the append-only notification ledger.
///
/// The ledger key is (subscriber, course), not the CRN.
/// When a course has several subscribed CRNs the "latest record" lookup
/// conflates them; that conflation is preserved behavior, surfaced in
/// logs rather than silently fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub subscriber_id: i64,
    pub course: String,
    /// Seat count carried by the notification
    pub seats: u32,
    pub kind: NotificationKind,
    pub sent_at: DateTime<Utc>,
}
