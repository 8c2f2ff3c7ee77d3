//! Configuration management for the form relay
//!
//! Configuration is loaded from environment variables. Outside production a
//! `.env` file is read first (see `is_production`).

use anyhow::{Context, Result};
use std::env;

/// Default Mailgun API base URL
pub const DEFAULT_MAILGUN_API_URL: &str = "https://api.mailgun.net";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Frontend origin allowed by CORS
    pub react_url: Option<String>,

    /// Mailgun API base URL
    pub mailgun_api_url: String,
    /// Mailgun API key
    pub mailgun_api_key: String,
    /// Mailgun sending domain
    pub mailgun_domain: String,
    /// Sender address for relayed emails
    pub mailgun_from: String,
    /// Recipient address for relayed emails
    pub mailgun_to: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,

            react_url: lookup("REACT_URL").filter(|value| !value.is_empty()),

            mailgun_api_url: lookup("MAILGUN_API_URL")
                .unwrap_or_else(|| DEFAULT_MAILGUN_API_URL.to_string()),
            mailgun_api_key: required("MAILGUN_API_KEY")?,
            mailgun_domain: required("MAILGUN_DOMAIN")?,
            mailgun_from: required("MAILGUN_FROM")?,
            mailgun_to: required("MAILGUN_TO")?,
        })
    }
}

/// Whether `ENV` marks this process as a production deployment
pub fn is_production() -> bool {
    env::var("ENV").map(|v| v == "production").unwrap_or(false)
}
