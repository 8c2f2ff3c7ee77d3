//! Mailgun API client
//!
//! Sends messages through Mailgun's `POST /v3/{domain}/messages` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use super::{EmailMessage, MailError, Mailer};
use crate::config::Config;

/// Upper bound on a single send, including the attachment upload
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful send response
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
    #[serde(default)]
    message: String,
}

/// Mailgun mailer
pub struct MailgunMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    domain: String,
    from: String,
    to: String,
}

impl MailgunMailer {
    /// Create a new Mailgun mailer
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.mailgun_api_url.trim_end_matches('/').to_string(),
            api_key: config.mailgun_api_key.clone(),
            domain: config.mailgun_domain.clone(),
            from: config.mailgun_from.clone(),
            to: config.mailgun_to.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v3/{}/messages", self.base_url, self.domain)
    }

    fn build_form(&self, message: EmailMessage) -> Result<Form, MailError> {
        let mut form = Form::new()
            .text("from", self.from.clone())
            .text("to", self.to.clone())
            .text("subject", message.subject)
            .text("text", message.body);

        if let Some(attachment) = message.attachment {
            let mut part = Part::bytes(attachment.data.to_vec()).file_name(attachment.filename);
            if let Some(content_type) = attachment.content_type {
                part = part.mime_str(&content_type)?;
            }
            form = form.part("attachment", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    #[instrument(skip(self, message), fields(subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<String, MailError> {
        let url = self.messages_url();
        let has_attachment = message.attachment.is_some();
        let form = self.build_form(message)?;

        debug!(url = %url, has_attachment, "Sending email via Mailgun");

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .multipart(form)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Mailgun response status");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Mailgun send request failed");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let result: SendResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %body, "Failed to parse Mailgun response");
            MailError::InvalidResponse(e.to_string())
        })?;

        debug!(id = %result.id, message = %result.message, "Email accepted by Mailgun");
        Ok(result.id)
    }
}
