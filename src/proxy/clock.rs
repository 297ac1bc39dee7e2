//! Timestamp source for signed requests

use crate::proxy::types::TimestampMillis;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

/// A clock stuck at one instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Hands out timestamps that never go backwards, even if the wall clock does
pub struct MonotonicTimestamps {
    clock: Box<dyn Clock>,
    high_water: AtomicU64,
}

impl MonotonicTimestamps {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            high_water: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> TimestampMillis {
        let now = self.clock.now_millis();
        let previous = self.high_water.fetch_max(now, Ordering::AcqRel);
        TimestampMillis::from(now.max(previous))
    }
}

impl Default for MonotonicTimestamps {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl std::fmt::Debug for MonotonicTimestamps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicTimestamps")
            .field("high_water", &self.high_water.load(Ordering::Relaxed))
            .finish()
    }
}
