//! Rate limit policy
//!
//! The policy is fixed: one request every 5 seconds with a burst of 3, and
//! per-client state is forgotten 60 seconds after it was created.

use std::time::Duration;

use governor::Quota;
use nonzero_ext::nonzero;

/// Time it takes to earn back one token
pub const REFILL_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum number of tokens a client can bank
pub const BURST_CAPACITY: u32 = 3;

/// Lifetime of a client's limiter, measured from its creation
pub const EVICTION_DELAY: Duration = Duration::from_secs(60);

/// Token bucket parameters shared by every client limiter
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Refill rate and burst capacity of each client bucket
    pub quota: Quota,
    /// Delay after creation at which a client entry is evicted
    pub eviction_delay: Duration,
}

impl RateLimitPolicy {
    /// Create a policy from an explicit quota and eviction delay
    pub fn new(quota: Quota, eviction_delay: Duration) -> Self {
        Self {
            quota,
            eviction_delay,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        // 12 per minute is one token every REFILL_INTERVAL
        let quota = Quota::per_minute(nonzero!(12u32)).allow_burst(nonzero!(3u32));

        Self {
            quota,
            eviction_delay: EVICTION_DELAY,
        }
    }
}
