//! Per-client token bucket
//!
//! A lock-free GCRA cell: the whole bucket is one atomic "theoretical arrival
//! time" (TAT), measured in nanoseconds from the bucket's creation. A request
//! at `t` conforms when `TAT - tolerance <= t`, where the tolerance is
//! `interval * (burst - 1)`, and pushes the TAT to `max(TAT, t) + interval`.
//!
//! An untouched or long idle bucket has its TAT at or before `t`, which
//! leaves exactly `burst` conforming requests. Time comes from a
//! [`governor::clock::Clock`] so tests can drive it with `FakeRelativeClock`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use governor::{clock::Reference, nanos::Nanos, Quota};

/// Token bucket held for a single client
#[derive(Debug)]
pub struct TokenBucket<P: Reference> {
    /// Instant the bucket was created; all offsets are relative to it
    start: P,
    tat: AtomicU64,
    interval: u64,
    tolerance: u64,
}

impl<P: Reference> TokenBucket<P> {
    /// Create a full bucket for `quota`, created at `start`
    pub fn new(quota: Quota, start: P) -> Self {
        let interval = Nanos::from(quota.replenish_interval()).as_u64().max(1);
        let burst = u64::from(quota.burst_size().get());

        Self {
            start,
            tat: AtomicU64::new(0),
            interval,
            tolerance: interval.saturating_mul(burst - 1),
        }
    }

    /// Take one token at `now`
    ///
    /// On denial returns how long until the next token is available.
    pub fn check(&self, now: P) -> Result<(), Duration> {
        let t = now.duration_since(self.start).as_u64();
        let mut tat = self.tat.load(Ordering::Acquire);

        loop {
            let allowed_from = t.saturating_add(self.tolerance);
            if tat > allowed_from {
                return Err(Duration::from_nanos(tat - allowed_from));
            }

            let next = tat.max(t).saturating_add(self.interval);
            match self
                .tat
                .compare_exchange_weak(tat, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(actual) => tat = actual,
            }
        }
    }
}
