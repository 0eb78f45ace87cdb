//! Capability interface to the scheduling surface.
//!
//! The engine never renders or locates elements itself; it consumes the
//! surface through this trait. One implementation ships with the binary
//! ([`bridge::BridgeSurface`], a thin HTTP client to an automation
//! bridge); tests substitute in-memory fakes.

pub mod bridge;

pub use bridge::BridgeSurface;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Labeled cells of the primary ("enabled") section listing.
///
/// The surface renders section rows as a flat run of labeled cells with
/// a fixed stride; see [`crate::engine::extract`].
pub const ENABLED_SECTION_CELLS: &str = "cellCss-hideOnMobileCss";

/// Labeled cells of the secondary ("disabled") section listing,
/// consulted only for subscribed CRNs absent from the primary one.
pub const DISABLED_SECTION_CELLS: &str = "cellCss-disabledSectionCss";

/// Address fragment appended by the surface's generic error page.
/// Stripping it and navigating to the remainder recovers the session.
pub const INVALID_PAGE_FRAGMENT: &str = "invalid.aspx?aspxerrorpath=/";

/// Opaque handle to one live monitoring session on the surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub String);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure classes the engine distinguishes at the surface seam.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The session handle no longer resolves. The owning course is
    /// marked lost and not re-monitored.
    #[error("session no longer exists")]
    SessionLost,

    /// The course could not be located in the surface's listing.
    /// Allocation is retried on the next reconciliation pass.
    #[error("course not found in surface listing")]
    CourseNotFound,

    /// Spinner, error page, slow render. Retried within the cycle's
    /// wait budget, never surfaced past the session boundary.
    #[error("transient surface fault: {0}")]
    Transient(String),

    /// Transport-level failure talking to the surface.
    #[error("surface transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Abstract rendering/navigation capability.
///
/// Reads of cells and signals apply to the currently focused session;
/// callers focus a session before extracting from it.
pub trait ContentSurface {
    /// Obtain a session bound to `course`, creating one if the surface
    /// can locate the course in its listing.
    fn ensure_session(&self, course: &str) -> Result<SessionHandle, SurfaceError>;

    /// Make `handle` the current session for subsequent reads.
    fn focus(&self, handle: &SessionHandle) -> Result<(), SurfaceError>;

    /// Trigger a full reload of the session's content.
    fn reload(&self, handle: &SessionHandle) -> Result<(), SurfaceError>;

    /// Navigate the session to an explicit address.
    fn navigate(&self, handle: &SessionHandle, address: &str) -> Result<(), SurfaceError>;

    /// The session's current address.
    fn current_address(&self, handle: &SessionHandle) -> Result<String, SurfaceError>;

    /// Visible text of every cell matching `selector`, in render order.
    fn read_labeled_cells(&self, selector: &str) -> Result<Vec<String>, SurfaceError>;

    /// True when the focused session explicitly shows zero sections
    /// ("Enabled (0 of 0)"), a legitimate state rather than a fault.
    fn signals_zero_sections(&self) -> bool;

    /// True when the focused session shows a spinner or error state.
    fn signals_transient_error(&self) -> bool;
}
