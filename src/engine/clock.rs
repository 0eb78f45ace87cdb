//! Injectable clock for the wait/retry and scheduling logic.
//!
//! Bounded waits are expressed against this trait so the extractor's
//! retry loop and the scheduler's sleeps run deterministically in tests
//! without real waiting.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::process::ShutdownFlag;

/// Monotonic time plus the ability to pause.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock implementation.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock for tests: `sleep` advances a virtual offset
/// instead of blocking.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Total virtual time elapsed.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().expect("clock mutex poisoned")
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        let mut offset = self.offset.lock().expect("clock mutex poisoned");
        *offset += duration;
    }
}

/// Sleep for `total`, in slices, returning early once `shutdown` is set.
pub fn sleep_interruptible(
    clock: &dyn Clock,
    shutdown: &ShutdownFlag,
    total: Duration,
    slice: Duration,
) {
    let deadline = clock.now() + total;
    while !shutdown.is_set() {
        let now = clock.now();
        if now >= deadline {
            break;
        }
        let remaining = deadline - now;
        clock.sleep(remaining.min(slice));
    }
}
