//! Record store contract.
//!
//! The persistent store owns subscribers, courses, settings, and the
//! notification ledger; the engine consumes it through this trait and
//! only ever writes back seat counts and notification records.

pub mod http;

pub use http::HttpStore;

use anyhow::Result;

use crate::models::{CourseSubscription, NotificationKind, NotificationRecord, Subscriber};

/// Request/response contract with the persistent record store.
///
/// Every method is synchronous and best-effort from the engine's
/// perspective; callers decide whether a failure aborts the cycle
/// (subscriber loads fall back to the previous snapshot) or is merely
/// logged (seat-count and ledger writes).
pub trait RecordStore: Send + Sync {
    /// All subscribers with their course subscriptions, expiry included.
    fn list_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Current [min, max] poll-interval bounds in seconds.
    fn interval_bounds(&self) -> Result<(f64, f64)>;

    /// Persist the freshly observed seat count for one subscription.
    fn update_last_seat_count(&self, subscription: &CourseSubscription, seats: u32) -> Result<()>;

    /// Append one row to the notification ledger.
    fn append_notification(
        &self,
        subscriber_id: i64,
        course: &str,
        seats: u32,
        kind: NotificationKind,
    ) -> Result<()>;

    /// Most recent ledger row for (subscriber, course), if any.
    ///
    /// Note the lookup key omits the CRN; with several subscribed CRNs
    /// in one course the records conflate.
    fn latest_notification(
        &self,
        subscriber_id: i64,
        course: &str,
    ) -> Result<Option<NotificationRecord>>;
}
