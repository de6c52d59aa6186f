//! Login attempt rate limiting with lockout.
//!
//! Policy is fixed: [`MAX_ATTEMPTS`] failures lock the identifier for
//! [`LOCKOUT_MINUTES`]. State lives in memory for the lifetime of the
//! process, keyed by an opaque identifier (typically `"login_{store_id}"`),
//! and is never persisted.
//!
//! Lockout expiry is detected lazily on the next call that consults the
//! record - there is no background timer to schedule or leak. Callers that
//! poll status will observe the lockout end within one poll interval.
//!
//! The record map is mutex-guarded and the wall clock is injected via
//! [`Clock`], so the limiter is safe under concurrent callers and testable
//! without sleeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Failed attempts allowed before lockout.
pub const MAX_ATTEMPTS: u32 = 5;

/// Lockout duration once attempts are exhausted.
pub const LOCKOUT_MINUTES: i64 = 15;

/// A wall-clock time source.
///
/// Production uses [`SystemClock`]; tests inject a manually advanced clock
/// so lockout expiry can be exercised without waiting fifteen minutes.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Per-identifier attempt bookkeeping.
#[derive(Debug, Clone)]
struct AttemptRecord {
    /// Failed attempts since the last reset.
    count: u32,
    /// When the first failure of this run was recorded.
    first_attempt: DateTime<Utc>,
    /// Set once `count` reaches [`MAX_ATTEMPTS`].
    locked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            first_attempt: now,
            locked_until: None,
        }
    }
}

/// In-memory login rate limiter.
///
/// Not a process-wide singleton: construct one per dashboard session (or
/// share one behind an `Arc`) and inject it where needed, which keeps tests
/// isolated from each other.
pub struct RateLimiter {
    records: Mutex<HashMap<String, AttemptRecord>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter with the given time source.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Lock the record map.
    ///
    /// A poisoned mutex only means another thread panicked mid-update; the
    /// map itself is still a valid attempt table, so recover the guard.
    fn records(&self) -> MutexGuard<'_, HashMap<String, AttemptRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the identifier may attempt a login right now.
    ///
    /// An expired lockout is cleared as a side effect, giving the identifier
    /// a fresh set of attempts.
    pub fn can_attempt(&self, id: &str) -> bool {
        let now = self.clock.now();
        let mut records = self.records();

        let Some(record) = records.get(id) else {
            return true;
        };

        if let Some(locked_until) = record.locked_until {
            if now >= locked_until {
                records.remove(id);
                return true;
            }
            return false;
        }

        record.count < MAX_ATTEMPTS
    }

    /// Record the outcome of an attempt.
    ///
    /// Success deletes the record entirely (full reset). Failure increments
    /// the count and locks the identifier once [`MAX_ATTEMPTS`] is reached.
    pub fn record_attempt(&self, id: &str, success: bool) {
        let now = self.clock.now();
        let mut records = self.records();

        if success {
            records.remove(id);
            return;
        }

        let record = records
            .entry(id.to_owned())
            .or_insert_with(|| AttemptRecord::new(now));

        // An expired lockout starts a fresh run rather than extending the old one.
        if record.locked_until.is_some_and(|until| now >= until) {
            *record = AttemptRecord::new(now);
        }

        record.count += 1;
        if record.count >= MAX_ATTEMPTS {
            record.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
            tracing::warn!(
                id,
                count = record.count,
                first_attempt = %record.first_attempt,
                "login attempts exhausted, identifier locked out"
            );
        }
    }

    /// Lock the identifier immediately for the full lockout duration.
    ///
    /// Used when the upstream credential provider reports it is already
    /// throttling this caller.
    pub fn force_lockout(&self, id: &str) {
        let now = self.clock.now();
        let mut records = self.records();

        let record = records
            .entry(id.to_owned())
            .or_insert_with(|| AttemptRecord::new(now));
        record.count = MAX_ATTEMPTS;
        record.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
        tracing::warn!(id, "identifier force-locked by provider throttle");
    }

    /// Minutes (ceiling) until the lockout expires, or 0 when not locked.
    pub fn remaining_minutes(&self, id: &str) -> i64 {
        let now = self.clock.now();
        let records = self.records();

        let Some(locked_until) = records.get(id).and_then(|r| r.locked_until) else {
            return 0;
        };

        let remaining = locked_until - now;
        let seconds = remaining.num_seconds();
        if seconds <= 0 {
            return 0;
        }
        // Round up so "30 seconds left" reads as one minute, never zero.
        let minutes = seconds.unsigned_abs().div_ceil(60);
        i64::try_from(minutes).unwrap_or(i64::MAX)
    }

    /// Attempts left before lockout; [`MAX_ATTEMPTS`] when no record exists.
    pub fn attempts_left(&self, id: &str) -> u32 {
        let records = self.records();
        records
            .get(id)
            .map_or(MAX_ATTEMPTS, |r| MAX_ATTEMPTS.saturating_sub(r.count))
    }
}
