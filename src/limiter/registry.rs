//! Per-client limiter registry
//!
//! Maps each client address to its own token bucket. Buckets are created
//! lazily on a client's first request and removed by a one-shot timer a fixed
//! delay after creation, whatever the client did in between. A client that
//! keeps sending traffic therefore gets a fresh bucket roughly once per
//! eviction delay.
//!
//! The map lock only covers lookup, insertion and removal. Token accounting
//! happens on the bucket's own atomic state, so clients never wait on each
//! other's arithmetic and concurrent requests from one client cannot spend the
//! same token twice. The tracked-clients gauge is published under the lock so
//! the last write always reflects the map.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use tracing::debug;

use super::{bucket::TokenBucket, policy::RateLimitPolicy};
use crate::routes::metrics;

/// Token bucket held for a single client
pub type ClientLimiter<C = DefaultClock> = TokenBucket<<C as Clock>::Instant>;

type Entries<C> = Mutex<HashMap<IpAddr, Arc<ClientLimiter<C>>>>;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// A token was consumed
    Allowed,
    /// The bucket is empty; the next token arrives after `retry_after`
    Denied { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// Registry of client limiters
///
/// Owned explicitly and shared through an `Arc`, so independent instances
/// (one per router, one per test) never see each other's clients.
pub struct RateLimitRegistry<C: Clock = DefaultClock> {
    policy: RateLimitPolicy,
    clock: C,
    entries: Arc<Entries<C>>,
}

impl RateLimitRegistry<DefaultClock> {
    /// Create a registry backed by the system clock
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, DefaultClock::default())
    }
}

impl Default for RateLimitRegistry<DefaultClock> {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

impl<C> RateLimitRegistry<C>
where
    C: Clock + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    /// Create a registry whose buckets read time from `clock`
    pub fn with_clock(policy: RateLimitPolicy, clock: C) -> Self {
        Self {
            policy,
            clock,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Try to take one token from `client`'s bucket
    ///
    /// Must be called from within a tokio runtime: creating a bucket spawns
    /// its eviction timer.
    pub fn check(&self, client: IpAddr) -> RateLimitDecision {
        let limiter = self.limiter_for(client);

        match limiter.check(self.clock.now()) {
            Ok(()) => RateLimitDecision::Allowed,
            Err(retry_after) => RateLimitDecision::Denied { retry_after },
        }
    }

    /// Number of clients currently tracked
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `client` currently has a bucket
    pub fn contains(&self, client: &IpAddr) -> bool {
        lock(&self.entries).contains_key(client)
    }

    /// Look up the client's bucket, creating it on first sight
    fn limiter_for(&self, client: IpAddr) -> Arc<ClientLimiter<C>> {
        let (limiter, tracked) = {
            let mut entries = lock(&self.entries);
            let limiter = match entries.entry(client) {
                Entry::Occupied(entry) => return Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let limiter = Arc::new(TokenBucket::new(self.policy.quota, self.clock.now()));
                    entry.insert(Arc::clone(&limiter));
                    limiter
                }
            };
            metrics::set_tracked_clients(entries.len());
            (limiter, entries.len())
        };

        debug!(client = %client, tracked, "Created rate limiter for new client");

        self.schedule_eviction(client);
        limiter
    }

    /// Remove `client`'s entry once the eviction delay has passed
    ///
    /// Eviction targets the key, not the bucket instance. Entries are only
    /// recreated after their eviction has run, so the key always still refers
    /// to the bucket this timer was scheduled for.
    fn schedule_eviction(&self, client: IpAddr) {
        let entries = Arc::downgrade(&self.entries);
        let delay = self.policy.eviction_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Registry dropped while the timer was pending
            let Some(entries) = entries.upgrade() else {
                return;
            };

            let tracked = {
                let mut entries = lock(&entries);
                entries.remove(&client);
                metrics::set_tracked_clients(entries.len());
                entries.len()
            };

            debug!(client = %client, tracked, "Evicted client rate limiter");
            metrics::record_eviction();
        });
    }
}

/// The critical sections never panic midway, so a poisoned map is still consistent
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
