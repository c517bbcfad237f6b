//! Wall-clock seam for the work cooldown.
use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch; must share its epoch with stored
/// `last_work_timestamp` values.
pub trait Clock {
    fn now_seconds(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64())
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: Cell<f64>,
}

impl FixedClock {
    #[must_use]
    pub const fn at(seconds: f64) -> Self {
        Self {
            now: Cell::new(seconds),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for FixedClock {
    fn now_seconds(&self) -> f64 {
        self.now.get()
    }
}
