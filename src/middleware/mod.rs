//! Middleware module
//!
//! Contains the per-client rate limiting middleware.

pub mod rate_limiter;
