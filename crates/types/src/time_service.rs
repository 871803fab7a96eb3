use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of one rate-limit bucket.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Day bucket index since the Unix epoch.
pub type DayIndex = u64;

/// Compute the day bucket for a timestamp in seconds.
/// Uses integer division - day 0 starts at t = 0.
#[inline]
pub const fn day_index(now_secs: u64) -> DayIndex {
    now_secs / SECONDS_PER_DAY
}

/// Source of wall-clock seconds. Implementations must never go backwards.
pub trait TimeSource: Send + Sync {
    fn now_secs(&self) -> u64;

    fn today(&self) -> DayIndex {
        day_index(self.now_secs())
    }
}

/// System clock clamped to be monotonically non-decreasing.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_secs: Mutex<u64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemClock {
    fn now_secs(&self) -> u64 {
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let mut last = self.last_secs.lock();
        if system_now > *last {
            *last = system_now;
        }
        *last
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start_secs: u64) -> Self {
        Self {
            now_secs: AtomicU64::new(start_secs),
        }
    }

    /// Advance the clock; it never moves backwards.
    pub fn advance(&self, secs: u64) {
        self.now_secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `secs` if it is later than the current reading.
    pub fn set(&self, secs: u64) {
        self.now_secs.fetch_max(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now_secs.load(Ordering::SeqCst)
    }
}
