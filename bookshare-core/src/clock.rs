//! Time source for mutation timestamps
//!
//! All timestamps are signed nanoseconds since the Unix epoch. The library never
//! reads the system time directly; it asks a [`Clock`] so tests can pin "now".

use std::sync::atomic::{AtomicI64, Ordering};

/// Nanoseconds since the Unix epoch
pub type Timestamp = i64;

/// Nanoseconds in one day
pub const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;

/// Source of "now" for mutations
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via chrono
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Only overflows after the year 2262
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(Timestamp::MAX)
    }
}

/// Manually driven clock (for testing)
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by the given number of nanoseconds
    pub fn advance(&self, nanos: i64) {
        self.now.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
