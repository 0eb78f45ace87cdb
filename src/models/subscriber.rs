//! Subscriber and course-subscription records read from the record store.
//!
//! The engine never owns these: they are re-derived from the store every
//! cycle by config sync. The only fields the engine writes back are the
//! per-subscription last-known seat counts and notification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (course, CRN) pair a subscriber wants watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSubscription {
    /// Store row identifier, used when writing back the seat count
    pub id: i64,
    /// Catalog-level course name, e.g. "CSCE 121"
    pub course: String,
    /// Unique registration code for one section of the course
    pub crn: String,
    /// Professor teaching the section (notification display only)
    pub professor: String,
    /// Last seat count persisted for this subscription, if any
    pub last_seat_count: Option<u32>,
}

/// A notification destination plus the subscriptions bound to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub name: String,
    /// Opaque notification-destination handle (webhook URL)
    pub webhook_url: String,
    /// Optional stop instant; expired subscribers are excluded from
    /// monitoring and dispatch entirely
    pub stop_at: Option<DateTime<Utc>>,
    pub subscriptions: Vec<CourseSubscription>,
}

impl Subscriber {
    /// Whether this subscriber's stop instant has passed as of `now`.
    ///
    /// A subscriber without a stop instant never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.stop_at {
            Some(stop_at) => now > stop_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscriber(stop_at: Option<DateTime<Utc>>) -> Subscriber {
        Subscriber {
            id: 1,
            name: "test".to_string(),
            webhook_url: "https://hooks.example/abc".to_string(),
            stop_at,
            subscriptions: Vec::new(),
        }
    }

    #[test]
    fn test_no_stop_instant_never_expires() {
        assert!(!subscriber(None).is_expired(Utc::now()));
    }

    #[test]
    fn test_past_stop_instant_is_expired() {
        let now = Utc::now();
        assert!(subscriber(Some(now - Duration::hours(1))).is_expired(now));
    }

    #[test]
    fn test_future_stop_instant_is_not_expired() {
        let now = Utc::now();
        assert!(!subscriber(Some(now + Duration::hours(1))).is_expired(now));
    }

    #[test]
    fn test_exact_stop_instant_is_not_expired() {
        let now = Utc::now();
        assert!(!subscriber(Some(now)).is_expired(now));
    }
}
