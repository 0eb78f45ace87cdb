//! Blocking HTTP implementation of [`RecordStore`].
//!
//! Speaks the record store's REST API: `GET /users/`, `GET /settings/`,
//! `PUT /courses/{id}`, `POST /notifications/`,
//! `GET /notifications/latest`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::RecordStore;
use crate::models::{CourseSubscription, NotificationKind, NotificationRecord, Subscriber};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the record store.
pub struct HttpStore {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct UserPayload {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    webhook_url: String,
    #[serde(default)]
    stop_time: Option<String>,
    #[serde(default)]
    courses: Vec<CoursePayload>,
}

#[derive(Deserialize)]
struct CoursePayload {
    id: i64,
    course_name: String,
    professor: String,
    crn: String,
    #[serde(default)]
    last_seat_count: Option<u32>,
}

#[derive(Deserialize)]
struct SettingsPayload {
    min_refresh_interval: f64,
    max_refresh_interval: f64,
}

#[derive(Serialize)]
struct CourseUpdatePayload<'a> {
    course_name: &'a str,
    professor: &'a str,
    crn: &'a str,
    last_seat_count: u32,
}

#[derive(Serialize)]
struct NotificationPayload<'a> {
    user_id: i64,
    course_name: &'a str,
    seats: u32,
    kind: NotificationKind,
}

#[derive(Deserialize)]
struct NotificationRecordPayload {
    user_id: i64,
    course_name: String,
    seats: u32,
    kind: NotificationKind,
    sent_at: DateTime<Utc>,
}

impl HttpStore {
    /// Create a client for the store at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("seatsweep")
            .build()
            .context("Failed to create record store HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Validate HTTP response status and return a descriptive error if not
/// successful.
fn ensure_success(response: &Response, context: &str) -> Result<()> {
    if !response.status().is_success() {
        let status = response.status();
        bail!(
            "{}: HTTP {} - {}",
            context,
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }
    Ok(())
}

/// Parse a stop instant as the store serializes it.
///
/// RFC 3339 when the store carries an offset, otherwise a naive
/// timestamp assumed to be in the reference (UTC) time zone.
fn parse_stop_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl From<UserPayload> for Subscriber {
    fn from(user: UserPayload) -> Self {
        let stop_at = user.stop_time.as_deref().and_then(|raw| {
            let parsed = parse_stop_instant(raw);
            if parsed.is_none() {
                warn!("unparsable stop instant {raw:?}; treating subscriber as unexpiring");
            }
            parsed
        });
        Subscriber {
            id: user.id,
            name: user.name.unwrap_or_default(),
            webhook_url: user.webhook_url,
            stop_at,
            subscriptions: user
                .courses
                .into_iter()
                .map(|course| CourseSubscription {
                    id: course.id,
                    course: course.course_name,
                    crn: course.crn,
                    professor: course.professor,
                    last_seat_count: course.last_seat_count,
                })
                .collect(),
        }
    }
}

impl RecordStore for HttpStore {
    fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let response = self
            .client
            .get(self.url("/users/"))
            .send()
            .context("Failed to fetch subscribers")?;
        ensure_success(&response, "Fetching subscribers")?;
        let users: Vec<UserPayload> = response
            .json()
            .context("Failed to parse subscriber payload")?;
        Ok(users.into_iter().map(Subscriber::from).collect())
    }

    fn interval_bounds(&self) -> Result<(f64, f64)> {
        let response = self
            .client
            .get(self.url("/settings/"))
            .send()
            .context("Failed to fetch settings")?;
        ensure_success(&response, "Fetching settings")?;
        let settings: SettingsPayload =
            response.json().context("Failed to parse settings payload")?;
        Ok((
            settings.min_refresh_interval,
            settings.max_refresh_interval,
        ))
    }

    fn update_last_seat_count(&self, subscription: &CourseSubscription, seats: u32) -> Result<()> {
        let payload = CourseUpdatePayload {
            course_name: &subscription.course,
            professor: &subscription.professor,
            crn: &subscription.crn,
            last_seat_count: seats,
        };
        let response = self
            .client
            .put(self.url(&format!("/courses/{}", subscription.id)))
            .json(&payload)
            .send()
            .context("Failed to update seat count")?;
        ensure_success(&response, "Updating seat count")
    }

    fn append_notification(
        &self,
        subscriber_id: i64,
        course: &str,
        seats: u32,
        kind: NotificationKind,
    ) -> Result<()> {
        let payload = NotificationPayload {
            user_id: subscriber_id,
            course_name: course,
            seats,
            kind,
        };
        let response = self
            .client
            .post(self.url("/notifications/"))
            .json(&payload)
            .send()
            .context("Failed to append notification record")?;
        ensure_success(&response, "Appending notification record")
    }

    fn latest_notification(
        &self,
        subscriber_id: i64,
        course: &str,
    ) -> Result<Option<NotificationRecord>> {
        let response = self
            .client
            .get(self.url("/notifications/latest"))
            .query(&[
                ("user_id", subscriber_id.to_string()),
                ("course_name", course.to_string()),
            ])
            .send()
            .context("Failed to fetch latest notification")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        ensure_success(&response, "Fetching latest notification")?;
        let record: NotificationRecordPayload = response
            .json()
            .context("Failed to parse notification record")?;
        Ok(Some(NotificationRecord {
            subscriber_id: record.user_id,
            course: record.course_name,
            seats: record.seats,
            kind: record.kind,
            sent_at: record.sent_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_stop_instant() {
        let parsed = parse_stop_instant("2026-05-01T12:00:00+00:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_naive_stop_instant_assumes_utc() {
        let parsed = parse_stop_instant("2026-05-01T12:00:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_naive_stop_instant_with_fraction() {
        assert!(parse_stop_instant("2026-05-01T12:00:00.500").is_some());
    }

    #[test]
    fn test_unparsable_stop_instant() {
        assert!(parse_stop_instant("next tuesday").is_none());
    }

    #[test]
    fn test_user_payload_conversion() {
        let user = UserPayload {
            id: 7,
            name: Some("reveille".to_string()),
            webhook_url: "https://hooks.example/7".to_string(),
            stop_time: Some("2026-05-01T12:00:00".to_string()),
            courses: vec![CoursePayload {
                id: 42,
                course_name: "CSCE 121".to_string(),
                professor: "Moore".to_string(),
                crn: "10001".to_string(),
                last_seat_count: Some(3),
            }],
        };

        let subscriber = Subscriber::from(user);
        assert_eq!(subscriber.id, 7);
        assert!(subscriber.stop_at.is_some());
        assert_eq!(subscriber.subscriptions.len(), 1);
        assert_eq!(subscriber.subscriptions[0].course, "CSCE 121");
        assert_eq!(subscriber.subscriptions[0].last_seat_count, Some(3));
    }
}
