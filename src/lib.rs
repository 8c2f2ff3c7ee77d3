//! Form relay - form submission backend with per-client rate limiting
//!
//! Accepts ride reservations and job applications over HTTP and relays them
//! as emails through Mailgun. Every route is guarded by an in-memory token
//! bucket per client IP address.

pub mod config;
pub mod error;
pub mod forms;
pub mod limiter;
pub mod mail;
pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::limiter::{RateLimitPolicy, RateLimitRegistry};
pub use crate::mail::{MailgunMailer, Mailer};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Email transport used by the form handlers
    pub mailer: Arc<dyn Mailer>,
    /// Per-client limiters consulted by the rate limiting middleware
    pub rate_limiter: Arc<RateLimitRegistry>,
}

impl AppState {
    /// Create a new application state backed by Mailgun
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let mailer: Arc<dyn Mailer> = Arc::new(MailgunMailer::new(http_client, &config));

        Ok(Self::with_mailer(config, mailer))
    }

    /// Create an application state around an existing mailer
    ///
    /// Uses a fresh registry with the fixed rate limit policy.
    pub fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config,
            mailer,
            rate_limiter: Arc::new(RateLimitRegistry::default()),
        }
    }
}
