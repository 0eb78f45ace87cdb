//! In-memory section state: last observed seat count per (course, CRN)
//! within the current process run.
//!
//! Pure container, no policy. An absent entry means "not yet observed
//! this run", which is distinct from "observed with 0 seats" - the
//! decision engine relies on that distinction. Only successful
//! extraction passes write here; a failed or timed-out extraction
//! leaves the previous observation intact.

use std::collections::HashMap;

/// Per-course CRN -> seats map for the current run.
#[derive(Debug, Default)]
pub struct SectionStates {
    states: HashMap<String, HashMap<String, u32>>,
}

impl SectionStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed seat count this run, if the CRN has been observed.
    pub fn get(&self, course: &str, crn: &str) -> Option<u32> {
        self.states.get(course).and_then(|crns| crns.get(crn)).copied()
    }

    /// Record a fresh observation.
    pub fn set(&mut self, course: &str, crn: &str, seats: u32) {
        self.states
            .entry(course.to_string())
            .or_default()
            .insert(crn.to_string(), seats);
    }
}
