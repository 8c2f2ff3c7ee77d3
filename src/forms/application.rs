//! Job application form
//!
//! Submitted as `multipart/form-data` with the applicant's resume in the
//! `resume` file part.

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use tracing::debug;

use super::require;
use crate::{
    error::{AppError, AppResult},
    mail::{Attachment, EmailMessage},
};

/// Name of the file part carrying the resume
pub const RESUME_FIELD: &str = "resume";

const RESUME_REQUIRED: &str = "Resume file is required";

/// Classify a failure while reading the multipart stream
fn upload_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(RESUME_REQUIRED.to_string())
    }
}

/// Decoded application form
#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub experience: String,
    pub availability: String,
    pub resume: Option<Attachment>,
}

impl ApplicationForm {
    /// Read every part of a multipart body
    ///
    /// Text fields take their first value, looking at the body before the
    /// `query` pairs. A body that cannot be read as multipart is treated as
    /// carrying no resume, except when it overran the upload limit. Unknown
    /// parts are skipped.
    pub async fn from_multipart(
        mut multipart: Multipart,
        query: &[(String, String)],
    ) -> AppResult<Self> {
        let mut form = Self::default();
        let mut values = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == RESUME_FIELD {
                // A resume part without a filename is a plain value, not a file
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(upload_error)?;

                if form.resume.is_none() {
                    debug!(filename = %filename, size = data.len(), "Received resume upload");
                    form.resume = Some(Attachment {
                        filename,
                        content_type,
                        data,
                    });
                }
                continue;
            }

            if field.file_name().is_some() {
                continue;
            }
            let value = field.text().await.map_err(upload_error)?;
            values.push((name, value));
        }

        form.fill_text_fields(values.iter().chain(query));
        Ok(form)
    }

    /// Assign each text field the first value found for its name
    fn fill_text_fields<'a>(&mut self, pairs: impl Iterator<Item = &'a (String, String)>) {
        let mut seen = [false; 6];

        for (name, value) in pairs {
            let (index, slot) = match name.as_str() {
                "firstName" => (0, &mut self.first_name),
                "lastName" => (1, &mut self.last_name),
                "email" => (2, &mut self.email),
                "phone" => (3, &mut self.phone),
                "experience" => (4, &mut self.experience),
                "availability" => (5, &mut self.availability),
                _ => continue,
            };

            if !seen[index] {
                seen[index] = true;
                *slot = value.clone();
            }
        }
    }

    /// Check the resume, then the text fields in form order
    pub fn validate(&self) -> AppResult<()> {
        if self.resume.is_none() {
            return Err(AppError::BadRequest(RESUME_REQUIRED.to_string()));
        }

        require(&self.first_name, "First name is required")?;
        require(&self.last_name, "Last name is required")?;
        require(&self.email, "Email is required")?;
        require(&self.phone, "Phone number is required")?;
        require(&self.experience, "Experience is required")?;
        require(&self.availability, "Availability is required")?;
        Ok(())
    }

    /// Render the notification email, attaching the resume
    pub fn into_email(self) -> EmailMessage {
        let subject = format!(
            "New Application Received - {} {}",
            self.first_name, self.last_name
        );
        let body = format!(
            "Name: {} {}\n\
             Email: {}\n\
             Phone: {}\n\
             Experience: {} years\n\
             Availability: {}",
            self.first_name,
            self.last_name,
            self.email,
            self.phone,
            self.experience,
            self.availability,
        );

        let message = EmailMessage::new(subject, body);
        match self.resume {
            Some(resume) => message.with_attachment(resume),
            None => message,
        }
    }
}
