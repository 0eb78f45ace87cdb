//! Per-course monitoring status state machine.
//!
//! Each course the engine has been asked to watch moves through:
//!
//! ```text
//! Unallocated -> Allocating -> Active -> Lost
//! ```
//!
//! `Lost` is terminal: when the surface reports a session handle gone,
//! the handle is dropped but the course stays marked as seen and is
//! never re-allocated by the new-course path. That gap is deliberate
//! (reproduced from the system this replaces) and is logged, not fixed.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monitoring status of one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    /// No session exists and none is being created
    Unallocated,
    /// A session is being requested from the surface
    Allocating,
    /// A live session is bound to this course
    Active,
    /// The surface reported the session gone; never re-allocated
    Lost,
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseStatus::Unallocated => write!(f, "unallocated"),
            CourseStatus::Allocating => write!(f, "allocating"),
            CourseStatus::Active => write!(f, "active"),
            CourseStatus::Lost => write!(f, "lost"),
        }
    }
}

impl CourseStatus {
    /// Check if transitioning from the current status to the new status
    /// is valid.
    ///
    /// Valid transitions:
    /// - `Unallocated` -> `Allocating`
    /// - `Allocating` -> `Active` | `Unallocated` (allocation failed, retry next pass)
    /// - `Active` -> `Lost`
    ///
    /// `Lost` is terminal and has no outgoing transitions.
    pub fn can_transition_to(&self, new_status: &CourseStatus) -> bool {
        // Same status is always valid (no-op)
        if self == new_status {
            return true;
        }

        match self {
            CourseStatus::Unallocated => matches!(new_status, CourseStatus::Allocating),
            CourseStatus::Allocating => {
                matches!(new_status, CourseStatus::Active | CourseStatus::Unallocated)
            }
            CourseStatus::Active => matches!(new_status, CourseStatus::Lost),
            CourseStatus::Lost => false,
        }
    }

    /// Attempt to transition to a new status, returning an error if invalid.
    pub fn try_transition(&self, new_status: CourseStatus) -> Result<CourseStatus> {
        if self.can_transition_to(&new_status) {
            Ok(new_status)
        } else {
            bail!("Invalid course status transition: {self} -> {new_status}")
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CourseStatus::Lost)
    }
}
