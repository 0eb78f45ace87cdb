//! Two-phase poll cycle and scheduler.
//!
//! Phase 1 walks every active session and triggers its refresh (or the
//! invalid-address redirect), so reload latency overlaps across
//! sessions before any extraction blocks on it. Phase 2 walks the
//! sessions again, extracts the listings, and runs the decision engine
//! against the synced subscriber snapshot. One session's fault never
//! aborts the cycle for the others.

use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::clock::{sleep_interruptible, Clock};
use super::decide::{decide, DecisionInput, Observation};
use super::extract::{extract_sections, parse_section_cells, ExtractPolicy, Extraction};
use super::registry::{CourseSession, SessionRegistry};
use super::state::SectionStates;
use crate::config::{ConfigSync, Snapshot};
use crate::models::{CourseSubscription, NotificationKind};
use crate::notify::NotificationSink;
use crate::process::ShutdownFlag;
use crate::store::RecordStore;
use crate::surface::{ContentSurface, SurfaceError, DISABLED_SECTION_CELLS, INVALID_PAGE_FRAGMENT};

/// Runner knobs. Defaults mirror the surface this engine was built
/// against; everything is overridable from the CLI.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Address fragment identifying the surface's generic error page
    pub invalid_page_fragment: String,
    /// Public scheduler address included in "available" notifications
    /// (omitted when empty)
    pub scheduler_url: String,
    pub extract_policy: ExtractPolicy,
    /// Slice size for interruptible inter-cycle sleeps
    pub sleep_slice: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            invalid_page_fragment: INVALID_PAGE_FRAGMENT.to_string(),
            scheduler_url: String::new(),
            extract_policy: ExtractPolicy::default(),
            sleep_slice: Duration::from_millis(250),
        }
    }
}

/// The monitor loop. Owns all engine state; nothing else mutates it.
pub struct Runner<'a> {
    surface: &'a dyn ContentSurface,
    store: &'a dyn RecordStore,
    sink: &'a dyn NotificationSink,
    clock: &'a dyn Clock,
    shutdown: ShutdownFlag,
    config: RunnerConfig,
    sync: ConfigSync<'a>,
    registry: SessionRegistry,
    tracker: SectionStates,
}

impl<'a> Runner<'a> {
    pub fn new(
        surface: &'a dyn ContentSurface,
        store: &'a dyn RecordStore,
        sink: &'a dyn NotificationSink,
        clock: &'a dyn Clock,
        shutdown: ShutdownFlag,
        config: RunnerConfig,
    ) -> Self {
        Self {
            surface,
            store,
            sink,
            clock,
            shutdown,
            config,
            sync: ConfigSync::new(store),
            registry: SessionRegistry::new(),
            tracker: SectionStates::new(),
        }
    }

    /// Engine-owned session table, exposed read-only.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Run poll cycles until shutdown is requested.
    pub fn run(&mut self) {
        info!("monitor loop started");
        while !self.shutdown.is_set() {
            let bounds = self.cycle();
            if self.shutdown.is_set() {
                break;
            }
            let delay = random_delay(bounds);
            debug!("next cycle in {delay:?}");
            sleep_interruptible(self.clock, &self.shutdown, delay, self.config.sleep_slice);
        }
        info!("monitor loop exited");
    }

    /// Execute one poll cycle and return the interval bounds that were
    /// current for it.
    pub fn cycle(&mut self) -> (f64, f64) {
        let snapshot = self.sync.load();
        self.registry.reconcile(&snapshot.course_set(), self.surface);

        // Phase 1: kick off refreshes across every session first
        for session in self.registry.active_sessions() {
            if let Err(e) = self.refresh_session(&session) {
                self.isolate_fault(&session.course, e);
            }
        }

        // Phase 2: extract and decide per session
        for session in self.registry.active_sessions() {
            if let Err(e) = self.check_course(&session, &snapshot) {
                self.isolate_fault(&session.course, e);
            }
        }

        snapshot.interval_bounds
    }

    /// Route a per-session fault so the rest of the cycle continues.
    fn isolate_fault(&mut self, course: &str, error: SurfaceError) {
        match error {
            SurfaceError::SessionLost => self.registry.mark_lost(course),
            other => warn!("cycle fault for {course}: {other}"),
        }
    }

    /// Refresh one session, or redirect it off the known error page.
    fn refresh_session(&self, session: &CourseSession) -> Result<(), SurfaceError> {
        let address = self.surface.current_address(&session.handle)?;
        if address.contains(&self.config.invalid_page_fragment) {
            let cleaned = address.replace(&self.config.invalid_page_fragment, "");
            debug!("redirecting {} off error page to {cleaned}", session.course);
            self.surface.navigate(&session.handle, &cleaned)
        } else {
            self.surface.reload(&session.handle)
        }
    }

    /// Extract one course's listings and run the decision engine.
    fn check_course(
        &mut self,
        session: &CourseSession,
        snapshot: &Snapshot,
    ) -> Result<(), SurfaceError> {
        self.surface.focus(&session.handle)?;

        let visible = match extract_sections(
            self.surface,
            self.clock,
            &session.handle,
            &self.config.extract_policy,
        )? {
            Extraction::Ready(map) => map,
            // Zero sections is a real observation: tracked CRNs are gone
            Extraction::Empty => BTreeMap::new(),
            Extraction::NotYet => {
                warn!(
                    "no content for {} within wait budget, skipping this cycle",
                    session.course
                );
                return Ok(());
            }
        };

        let visible = self.consult_secondary(&session.course, visible, snapshot);
        self.apply_decisions(&session.course, &visible, snapshot);
        Ok(())
    }

    /// Look up subscribed CRNs absent from the primary listing in the
    /// secondary ("disabled") one. Only the missing CRNs are taken.
    fn consult_secondary(
        &self,
        course: &str,
        mut visible: BTreeMap<String, u32>,
        snapshot: &Snapshot,
    ) -> BTreeMap<String, u32> {
        let missing: BTreeSet<String> = snapshot
            .subscribers
            .iter()
            .flat_map(|subscriber| subscriber.subscriptions.iter())
            .filter(|sub| sub.course == course && !visible.contains_key(&sub.crn))
            .map(|sub| sub.crn.clone())
            .collect();
        if missing.is_empty() {
            return visible;
        }

        match self.surface.read_labeled_cells(DISABLED_SECTION_CELLS) {
            Ok(cells) => {
                let secondary = parse_section_cells(&cells);
                for crn in missing {
                    if let Some(&seats) = secondary.get(&crn) {
                        debug!("CRN {crn} for {course} found in secondary listing");
                        visible.insert(crn, seats);
                    }
                }
            }
            Err(e) => warn!("secondary listing read failed for {course}: {e}"),
        }
        visible
    }

    /// Run the decision table for every subscribed CRN of `course`.
    ///
    /// Tracked state is written once per CRN after all subscribers are
    /// processed, so every subscriber decides against the same prior.
    fn apply_decisions(
        &mut self,
        course: &str,
        visible: &BTreeMap<String, u32>,
        snapshot: &Snapshot,
    ) {
        let mut observed: BTreeMap<String, u32> = BTreeMap::new();

        for subscriber in &snapshot.subscribers {
            let subscriptions: Vec<&CourseSubscription> = subscriber
                .subscriptions
                .iter()
                .filter(|sub| sub.course == course)
                .collect();
            if subscriptions.len() > 1 {
                // Ledger key is (subscriber, course): multiple CRNs share it
                debug!(
                    "ledger lookups for {course} conflate {} subscribed CRNs (subscriber {})",
                    subscriptions.len(),
                    subscriber.id
                );
            }

            for sub in subscriptions {
                let prior_run = self.tracker.get(course, &sub.crn);
                let current = match visible.get(&sub.crn) {
                    Some(&seats) => Observation::Seen(seats),
                    None => Observation::Missing,
                };

                if prior_run.is_none() && current == Observation::Missing {
                    warn!(
                        "CRN {} for {course} absent from both listings; likely invalid input",
                        sub.crn
                    );
                    continue;
                }

                let last_notified = match self.store.latest_notification(subscriber.id, course) {
                    Ok(record) => record.map(|record| record.seats),
                    Err(e) => {
                        warn!("latest-notification lookup failed: {e:#}");
                        None
                    }
                };

                let input = DecisionInput {
                    prior_run,
                    last_notified,
                    last_persisted: sub.last_seat_count,
                    current,
                };

                if let Some(decision) = decide(&input) {
                    let (title, body) = self.compose(sub, &decision.kind, decision.seats);
                    info!(
                        "notifying {} (subscriber {}): {title}",
                        subscriber.name, subscriber.id
                    );
                    self.sink.deliver(&subscriber.webhook_url, &title, &body);
                    if let Err(e) = self.store.append_notification(
                        subscriber.id,
                        course,
                        decision.seats,
                        decision.kind,
                    ) {
                        warn!("failed to persist notification record: {e:#}");
                    }
                }

                let seats = match current {
                    Observation::Seen(seats) => seats,
                    Observation::Missing => 0,
                };
                observed.insert(sub.crn.clone(), seats);
                if let Err(e) = self.store.update_last_seat_count(sub, seats) {
                    warn!("failed to persist seat count for CRN {}: {e:#}", sub.crn);
                }
            }
        }

        for (crn, seats) in observed {
            self.tracker.set(course, &crn, seats);
        }
    }

    /// Notification title and body, in the house format.
    fn compose(
        &self,
        sub: &CourseSubscription,
        kind: &NotificationKind,
        seats: u32,
    ) -> (String, String) {
        match kind {
            NotificationKind::Initial | NotificationKind::Available => {
                let title = format!("Seats Available ({seats})");
                let mut body = format!(
                    "{} with {} is available.\nCRN: {}",
                    sub.course, sub.professor, sub.crn
                );
                if !self.config.scheduler_url.is_empty() {
                    body.push_str(&format!("\nSchedule builder: {}", self.config.scheduler_url));
                }
                (title, body)
            }
            NotificationKind::Full => {
                let title = "Section Full".to_string();
                let body = format!(
                    "{} with {} is now full.\nCRN: {}",
                    sub.course, sub.professor, sub.crn
                );
                (title, body)
            }
        }
    }
}

/// Uniform draw from the configured bounds.
fn random_delay((min, max): (f64, f64)) -> Duration {
    let secs = if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    };
    Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_delay_within_bounds() {
        for _ in 0..100 {
            let delay = random_delay((30.0, 40.0));
            assert!(delay >= Duration::from_secs_f64(30.0));
            assert!(delay <= Duration::from_secs_f64(40.0));
        }
    }

    #[test]
    fn test_random_delay_degenerate_bounds() {
        assert_eq!(random_delay((30.0, 30.0)), Duration::from_secs_f64(30.0));
    }

    #[test]
    fn test_random_delay_never_negative() {
        assert_eq!(random_delay((-5.0, -5.0)), Duration::ZERO);
    }
}
