//! Outbound webhook notification sink.
//!
//! Delivery is fire-and-forget: non-2xx responses and transport errors
//! are logged and never retried. Dedup lives in the decision engine,
//! not here.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Best-effort delivery of one notification to a destination handle.
pub trait NotificationSink {
    fn deliver(&self, destination: &str, title: &str, body: &str);
}

#[derive(Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    embeds: Vec<Embed<'a>>,
}

/// Posts embed-shaped JSON to webhook URLs.
pub struct WebhookSink {
    client: Client,
}

impl WebhookSink {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("seatsweep")
            .build()
            .context("Failed to create webhook HTTP client")?;
        Ok(Self { client })
    }
}

impl NotificationSink for WebhookSink {
    fn deliver(&self, destination: &str, title: &str, body: &str) {
        let payload = WebhookBody {
            embeds: vec![Embed {
                title,
                description: body,
            }],
        };

        match self.client.post(destination).json(&payload).send() {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(
                    "webhook delivery returned HTTP {}: {title}",
                    response.status()
                );
            }
            Err(e) => {
                warn!("webhook delivery failed: {e}");
            }
        }
    }
}
