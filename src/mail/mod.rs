//! Outbound email
//!
//! Defines the `Mailer` seam used by the form handlers and the Mailgun
//! implementation used in production.

pub mod mailgun;
pub mod message;

use async_trait::async_trait;
use thiserror::Error;

pub use self::mailgun::MailgunMailer;
pub use self::message::{Attachment, EmailMessage};

/// Errors raised while handing a message to the email provider
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid email provider response: {0}")]
    InvalidResponse(String),
}

/// Trait defining the interface for email transports
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Send a message to the configured recipient
    ///
    /// Returns the provider's message id.
    async fn send(&self, message: EmailMessage) -> Result<String, MailError>;
}
