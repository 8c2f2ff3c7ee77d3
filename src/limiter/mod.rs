//! Per-client rate limiting
//!
//! In-memory token buckets keyed by client address.

pub mod bucket;
pub mod policy;
pub mod registry;

pub use self::bucket::TokenBucket;
pub use self::policy::{RateLimitPolicy, BURST_CAPACITY, EVICTION_DELAY, REFILL_INTERVAL};
pub use self::registry::{ClientLimiter, RateLimitDecision, RateLimitRegistry};
