//! Section extraction: labeled cells -> CRN -> seat-count map.
//!
//! The surface renders section rows as a flat run of labeled cells with
//! a fixed stride: every 6th cell starting at offset 0 is a CRN, and
//! the cell at offset +3 is its open-seat count. Extraction waits for
//! the first cell to appear within a bounded budget, reloading the
//! session when the surface looks errored, and reports an explicit
//! outcome instead of signalling timeouts through errors.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::clock::Clock;
use crate::surface::{ContentSurface, SessionHandle, SurfaceError, ENABLED_SECTION_CELLS};

/// Cells per section row.
const ROW_STRIDE: usize = 6;
/// Offset of the seat-count cell within a row, relative to the CRN cell.
const SEATS_OFFSET: usize = 3;

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Sections rendered; CRN -> open seats.
    Ready(BTreeMap<String, u32>),
    /// The surface explicitly reports zero sections. Legitimate state,
    /// not a fault.
    Empty,
    /// Nothing rendered within the wait budget. The cycle skips this
    /// course without touching tracked state.
    NotYet,
}

/// Timing knobs for the bounded wait/reload loop.
#[derive(Debug, Clone)]
pub struct ExtractPolicy {
    /// Total wait budget per course per cycle
    pub budget: Duration,
    /// How long to wait for the first cell before forcing a reload
    pub first_cell_wait: Duration,
    /// Pause between polls of the rendered content
    pub poll_interval: Duration,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(20),
            first_cell_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Parse the fixed-stride cell run into a CRN -> seats map.
///
/// Non-numeric or missing seat-count text is treated as 0 open seats
/// rather than a parse failure.
pub fn parse_section_cells(cells: &[String]) -> BTreeMap<String, u32> {
    let mut sections = BTreeMap::new();
    for row_start in (0..cells.len()).step_by(ROW_STRIDE) {
        let crn = cells[row_start].trim();
        if crn.is_empty() {
            continue;
        }
        let seats = cells
            .get(row_start + SEATS_OFFSET)
            .and_then(|text| text.trim().parse::<u32>().ok())
            .unwrap_or(0);
        sections.insert(crn.to_string(), seats);
    }
    sections
}

/// Extract the primary listing for the focused session.
///
/// Retry policy: poll for cells; if the surface signals zero sections,
/// stop with [`Extraction::Empty`]; if it signals a transient error (or
/// the first-cell wait elapses with nothing rendered), force a reload
/// and keep waiting until the budget runs out.
pub fn extract_sections(
    surface: &dyn ContentSurface,
    clock: &dyn Clock,
    handle: &SessionHandle,
    policy: &ExtractPolicy,
) -> Result<Extraction, SurfaceError> {
    let deadline = clock.now() + policy.budget;
    let mut reload_at = clock.now() + policy.first_cell_wait;

    loop {
        let cells = surface.read_labeled_cells(ENABLED_SECTION_CELLS)?;
        if !cells.is_empty() {
            return Ok(Extraction::Ready(parse_section_cells(&cells)));
        }

        if surface.signals_zero_sections() {
            return Ok(Extraction::Empty);
        }

        let now = clock.now();
        if now >= deadline {
            debug!("no section cells within budget for session {handle}");
            return Ok(Extraction::NotYet);
        }

        if surface.signals_transient_error() || now >= reload_at {
            surface.reload(handle)?;
            reload_at = clock.now() + policy.first_cell_wait;
        }

        clock.sleep(policy.poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use std::sync::Mutex;

    fn cells(rows: &[(&str, &str)]) -> Vec<String> {
        let mut out = Vec::new();
        for (crn, seats) in rows {
            out.push(crn.to_string());
            out.push("MWF 9:10-10:00".to_string());
            out.push("HRBB 113".to_string());
            out.push(seats.to_string());
            out.push("Moore".to_string());
            out.push("Lecture".to_string());
        }
        out
    }

    #[test]
    fn test_stride_parsing() {
        let parsed = parse_section_cells(&cells(&[("10001", "4"), ("10002", "0")]));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["10001"], 4);
        assert_eq!(parsed["10002"], 0);
    }

    #[test]
    fn test_unparsable_seats_default_to_zero() {
        let parsed = parse_section_cells(&cells(&[("10001", "Closed")]));
        assert_eq!(parsed["10001"], 0);
    }

    #[test]
    fn test_truncated_row_defaults_to_zero() {
        // CRN rendered but the row cut off before the seats cell
        let parsed = parse_section_cells(&["10001".to_string(), "MWF".to_string()]);
        assert_eq!(parsed["10001"], 0);
    }

    #[test]
    fn test_empty_cells_give_empty_map() {
        assert!(parse_section_cells(&[]).is_empty());
    }

    #[test]
    fn test_blank_crn_rows_are_skipped() {
        let mut run = cells(&[("10001", "4")]);
        run[0] = "  ".to_string();
        assert!(parse_section_cells(&run).is_empty());
    }

    /// Surface whose listing renders only after a number of reloads.
    struct SlowSurface {
        cells_after_reloads: u32,
        cells: Vec<String>,
        transient: bool,
        reloads: Mutex<u32>,
    }

    impl SlowSurface {
        fn new(cells_after_reloads: u32, rows: &[(&str, &str)]) -> Self {
            Self {
                cells_after_reloads,
                cells: cells(rows),
                transient: false,
                reloads: Mutex::new(0),
            }
        }

        fn reloads(&self) -> u32 {
            *self.reloads.lock().unwrap()
        }
    }

    impl ContentSurface for SlowSurface {
        fn ensure_session(&self, _: &str) -> Result<SessionHandle, SurfaceError> {
            Ok(SessionHandle("tab-1".to_string()))
        }

        fn focus(&self, _: &SessionHandle) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn reload(&self, _: &SessionHandle) -> Result<(), SurfaceError> {
            *self.reloads.lock().unwrap() += 1;
            Ok(())
        }

        fn navigate(&self, _: &SessionHandle, _: &str) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn current_address(&self, _: &SessionHandle) -> Result<String, SurfaceError> {
            Ok("https://surface.example".to_string())
        }

        fn read_labeled_cells(&self, _: &str) -> Result<Vec<String>, SurfaceError> {
            if self.reloads() >= self.cells_after_reloads {
                Ok(self.cells.clone())
            } else {
                Ok(Vec::new())
            }
        }

        fn signals_zero_sections(&self) -> bool {
            false
        }

        fn signals_transient_error(&self) -> bool {
            self.transient
        }
    }

    fn policy() -> ExtractPolicy {
        ExtractPolicy {
            budget: Duration::from_secs(10),
            first_cell_wait: Duration::from_secs(2),
            poll_interval: Duration::from_millis(500),
        }
    }

    fn handle() -> SessionHandle {
        SessionHandle("tab-1".to_string())
    }

    #[test]
    fn test_immediate_cells_need_no_reload() {
        let surface = SlowSurface::new(0, &[("10001", "4")]);
        let clock = ManualClock::new();

        let result = extract_sections(&surface, &clock, &handle(), &policy()).unwrap();
        assert!(matches!(result, Extraction::Ready(map) if map["10001"] == 4));
        assert_eq!(surface.reloads(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_first_cell_wait_forces_reload_then_ready() {
        let surface = SlowSurface::new(1, &[("10001", "4")]);
        let clock = ManualClock::new();

        let result = extract_sections(&surface, &clock, &handle(), &policy()).unwrap();
        assert!(matches!(result, Extraction::Ready(map) if map["10001"] == 4));
        assert_eq!(surface.reloads(), 1);
        // Nothing rendered until the first-cell wait elapsed
        assert!(clock.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_transient_error_reloads_before_first_cell_wait() {
        let mut surface = SlowSurface::new(1, &[("10001", "4")]);
        surface.transient = true;
        let clock = ManualClock::new();

        let result = extract_sections(&surface, &clock, &handle(), &policy()).unwrap();
        assert!(matches!(result, Extraction::Ready(_)));
        assert!(
            clock.elapsed() < Duration::from_secs(2),
            "errored surface is reloaded without waiting out the first-cell wait"
        );
    }

    #[test]
    fn test_budget_exhaustion_returns_not_yet() {
        let surface = SlowSurface::new(u32::MAX, &[]);
        let clock = ManualClock::new();

        let result = extract_sections(&surface, &clock, &handle(), &policy()).unwrap();
        assert_eq!(result, Extraction::NotYet);
        assert!(clock.elapsed() >= Duration::from_secs(10));
        assert!(surface.reloads() >= 1, "reloads were attempted inside the budget");
    }
}
