//! Notification decision engine.
//!
//! A pure function of four inputs per (subscriber, course, CRN): the
//! current observation, this run's prior observation, the latest
//! persisted notification for the (subscriber, course) pair, and the
//! persisted last-known seat count. Emission is boundary-crossing only:
//! transitions that stay inside the >0 range are silent. (This
//! supersedes the notify-on-any-change policy this system evolved
//! from; do not reintroduce it.)

use crate::models::NotificationKind;

/// What extraction saw for one CRN this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Present in the primary or secondary listing with this many seats
    Seen(u32),
    /// Absent from both listings
    Missing,
}

/// Inputs for one (subscriber, course, CRN) decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput {
    /// Seats last observed this run, if observed
    pub prior_run: Option<u32>,
    /// Seat count on the latest persisted notification for the
    /// (subscriber, course) pair, if any
    pub last_notified: Option<u32>,
    /// Last-known seat count persisted with the subscription, if any
    pub last_persisted: Option<u32>,
    pub current: Observation,
}

/// A notification to emit plus the seat count to persist with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub kind: NotificationKind,
    pub seats: u32,
}

/// Decide whether to notify.
///
/// First sight this run compares against persisted evidence (the latest
/// notification record, falling back to the stored seat count) so a
/// restart does not re-announce an unchanged section. After that, only
/// 0 <-> >0 crossings emit. A tracked CRN missing from both listings
/// counts as 0 seats.
pub fn decide(input: &DecisionInput) -> Option<Decision> {
    match (input.prior_run, input.current) {
        (None, Observation::Seen(current)) => {
            let reference = input.last_notified.or(input.last_persisted);
            if reference == Some(current) {
                // Nothing changed since the last run
                return None;
            }
            if current > 0 {
                Some(Decision {
                    kind: NotificationKind::Initial,
                    seats: current,
                })
            } else {
                None
            }
        }
        // Never observed and not rendered: nothing to say
        (None, Observation::Missing) => None,
        (Some(prior), Observation::Seen(current)) => {
            if prior > 0 && current == 0 {
                Some(Decision {
                    kind: NotificationKind::Full,
                    seats: 0,
                })
            } else if prior == 0 && current > 0 {
                Some(Decision {
                    kind: NotificationKind::Available,
                    seats: current,
                })
            } else {
                None
            }
        }
        (Some(prior), Observation::Missing) => {
            if prior > 0 {
                Some(Decision {
                    kind: NotificationKind::Full,
                    seats: 0,
                })
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        prior_run: Option<u32>,
        last_notified: Option<u32>,
        last_persisted: Option<u32>,
        current: Observation,
    ) -> DecisionInput {
        DecisionInput {
            prior_run,
            last_notified,
            last_persisted,
            current,
        }
    }

    #[test]
    fn test_first_sight_no_history_with_seats_emits_initial() {
        let decision = decide(&input(None, None, None, Observation::Seen(4))).unwrap();
        assert_eq!(decision.kind, NotificationKind::Initial);
        assert_eq!(decision.seats, 4);
    }

    #[test]
    fn test_first_sight_no_history_full_is_silent() {
        assert_eq!(decide(&input(None, None, None, Observation::Seen(0))), None);
    }

    #[test]
    fn test_first_sight_matching_notification_record_is_silent() {
        // Dedup across restart: ledger says 5 seats, still 5 seats
        assert_eq!(
            decide(&input(None, Some(5), None, Observation::Seen(5))),
            None
        );
    }

    #[test]
    fn test_first_sight_matching_persisted_count_is_silent() {
        assert_eq!(
            decide(&input(None, None, Some(3), Observation::Seen(3))),
            None
        );
    }

    #[test]
    fn test_first_sight_changed_count_emits_initial() {
        let decision = decide(&input(None, Some(2), None, Observation::Seen(6))).unwrap();
        assert_eq!(decision.kind, NotificationKind::Initial);
        assert_eq!(decision.seats, 6);
    }

    #[test]
    fn test_first_sight_changed_to_zero_is_silent() {
        assert_eq!(
            decide(&input(None, Some(2), None, Observation::Seen(0))),
            None
        );
    }

    #[test]
    fn test_notification_record_takes_precedence_over_persisted_count() {
        // Ledger says 4, subscription row says 2, current is 4: silent
        assert_eq!(
            decide(&input(None, Some(4), Some(2), Observation::Seen(4))),
            None
        );
    }

    #[test]
    fn test_first_sight_missing_is_silent() {
        assert_eq!(decide(&input(None, None, Some(5), Observation::Missing)), None);
    }

    #[test]
    fn test_became_full_emits() {
        let decision = decide(&input(Some(3), None, None, Observation::Seen(0))).unwrap();
        assert_eq!(decision.kind, NotificationKind::Full);
        assert_eq!(decision.seats, 0);
    }

    #[test]
    fn test_became_available_emits() {
        let decision = decide(&input(Some(0), None, None, Observation::Seen(2))).unwrap();
        assert_eq!(decision.kind, NotificationKind::Available);
        assert_eq!(decision.seats, 2);
    }

    #[test]
    fn test_change_within_positive_range_is_silent() {
        assert_eq!(decide(&input(Some(5), None, None, Observation::Seen(7))), None);
        assert_eq!(decide(&input(Some(7), None, None, Observation::Seen(5))), None);
    }

    #[test]
    fn test_unchanged_is_silent() {
        assert_eq!(decide(&input(Some(5), None, None, Observation::Seen(5))), None);
        assert_eq!(decide(&input(Some(0), None, None, Observation::Seen(0))), None);
    }

    #[test]
    fn test_tracked_disappearance_emits_full() {
        let decision = decide(&input(Some(2), None, None, Observation::Missing)).unwrap();
        assert_eq!(decision.kind, NotificationKind::Full);
        assert_eq!(decision.seats, 0);
    }

    #[test]
    fn test_tracked_full_disappearance_is_silent() {
        assert_eq!(decide(&input(Some(0), None, None, Observation::Missing)), None);
    }

    #[test]
    fn test_decision_is_idempotent() {
        let probe = input(None, Some(2), Some(2), Observation::Seen(6));
        assert_eq!(decide(&probe), decide(&probe));

        let probe = input(Some(5), None, None, Observation::Seen(0));
        assert_eq!(decide(&probe), decide(&probe));
    }
}
