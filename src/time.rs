//! # Time Provider
//!
//! Abstraction over wall-clock time so SLA deadlines, breaker cooldowns and
//! staleness windows can be exercised deterministically in tests.

use crate::constants::limits::MAX_DURATION_SECONDS;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Source of the current UTC time
pub trait TimeProvider: Send + Sync + fmt::Debug + 'static {
    /// Current UTC timestamp
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Production time provider backed by the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven time provider for tests
///
/// Clones share the same underlying instant, so advancing one handle is
/// observed by every component holding another.
#[derive(Debug, Clone)]
pub struct ManualTimeProvider {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTimeProvider {
    /// Start the clock at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Start the clock at the current system time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl TimeProvider for ManualTimeProvider {
    fn utc_now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Shared handle used by every component
pub type SharedTimeProvider = Arc<dyn TimeProvider>;

/// Convenience constructor for the system clock handle
pub fn system_time() -> SharedTimeProvider {
    Arc::new(SystemTimeProvider)
}

/// `seconds` as a signed duration, clamped to the configured maximum
pub fn duration_from_secs(seconds: u64) -> Duration {
    let seconds = seconds.min(MAX_DURATION_SECONDS);
    Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX / 1000))
}

/// `millis` as a signed duration, clamped to the configured maximum
pub fn duration_from_millis(millis: u64) -> Duration {
    let millis = millis.min(MAX_DURATION_SECONDS.saturating_mul(1000));
    Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX / 1000))
}

/// Fractional `hours` as a duration; non-finite or negative input yields zero
/// and large input is clamped to the configured maximum
pub fn duration_from_hours(hours: f64) -> Duration {
    if !hours.is_finite() || hours <= 0.0 {
        return Duration::zero();
    }
    let max_millis = MAX_DURATION_SECONDS as f64 * 1000.0;
    Duration::milliseconds((hours * 3_600_000.0).round().min(max_millis) as i64)
}
