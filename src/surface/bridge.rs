//! HTTP client for an external automation bridge.
//!
//! The bridge owns the actual browser/rendering machinery; this client
//! maps each [`ContentSurface`] capability onto one small JSON endpoint.
//! Rendering and element location stay entirely on the bridge side.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::{ContentSurface, SessionHandle, SurfaceError};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Capability client for a remote rendering bridge.
pub struct BridgeSurface {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct SessionPayload {
    handle: String,
}

#[derive(Deserialize)]
struct AddressPayload {
    address: String,
}

#[derive(Deserialize)]
struct CellsPayload {
    cells: Vec<String>,
}

#[derive(Deserialize, Default)]
struct SignalsPayload {
    #[serde(default)]
    zero_sections: bool,
    #[serde(default)]
    transient_error: bool,
}

impl BridgeSurface {
    /// Create a client for the bridge at `base_url`.
    ///
    /// Timeouts bound every capability call so a hung bridge cannot
    /// stall a cycle indefinitely.
    pub fn new(base_url: &str) -> Result<Self, SurfaceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("seatsweep")
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map HTTP status classes onto the engine's failure taxonomy.
    fn check(response: Response) -> Result<Response, SurfaceError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::GONE | StatusCode::NOT_FOUND => Err(SurfaceError::SessionLost),
            status => Err(SurfaceError::Transient(format!(
                "bridge returned HTTP {status}"
            ))),
        }
    }

    fn signals(&self) -> SignalsPayload {
        let result = self
            .client
            .get(self.url("/signals"))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<SignalsPayload>());
        match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to read surface signals: {e}");
                SignalsPayload::default()
            }
        }
    }
}

impl ContentSurface for BridgeSurface {
    fn ensure_session(&self, course: &str) -> Result<SessionHandle, SurfaceError> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&serde_json::json!({ "course": course }))
            .send()?;
        // 404 here means the listing has no such course, not a dead handle
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SurfaceError::CourseNotFound);
        }
        let payload: SessionPayload = Self::check(response)?.json()?;
        Ok(SessionHandle(payload.handle))
    }

    fn focus(&self, handle: &SessionHandle) -> Result<(), SurfaceError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{handle}/focus")))
            .send()?;
        Self::check(response).map(|_| ())
    }

    fn reload(&self, handle: &SessionHandle) -> Result<(), SurfaceError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{handle}/reload")))
            .send()?;
        Self::check(response).map(|_| ())
    }

    fn navigate(&self, handle: &SessionHandle, address: &str) -> Result<(), SurfaceError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{handle}/navigate")))
            .json(&serde_json::json!({ "address": address }))
            .send()?;
        Self::check(response).map(|_| ())
    }

    fn current_address(&self, handle: &SessionHandle) -> Result<String, SurfaceError> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{handle}/address")))
            .send()?;
        let payload: AddressPayload = Self::check(response)?.json()?;
        Ok(payload.address)
    }

    fn read_labeled_cells(&self, selector: &str) -> Result<Vec<String>, SurfaceError> {
        let response = self
            .client
            .get(self.url("/cells"))
            .query(&[("selector", selector)])
            .send()?;
        let payload: CellsPayload = Self::check(response)?.json()?;
        Ok(payload.cells)
    }

    fn signals_zero_sections(&self) -> bool {
        self.signals().zero_sections
    }

    fn signals_transient_error(&self) -> bool {
        self.signals().transient_error
    }
}
