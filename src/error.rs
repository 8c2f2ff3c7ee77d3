//! Error types for the form relay
//!
//! Every failure a request can hit is an `AppError`; each variant maps to one
//! status code and body shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{mail::MailError, response::ApiResponse};

/// Body of the 429 response
pub const RATE_LIMIT_MESSAGE: &str = "The API is at capacity, try again later.";

/// Body of the 500 response when an email could not be delivered
pub const EMAIL_FAILURE_MESSAGE: &str =
    "Could not receive application. Please contact us directly.";

/// Body of the 413 response for oversized uploads
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Uploaded file is too large";

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// The connection's peer address is missing or unusable
    #[error("Client address unavailable")]
    AddressUnavailable,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body went over the route's size limit
    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Email delivery failed: {0}")]
    Mail(#[from] MailError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AddressUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiResponse::new(
                    RATE_LIMIT_MESSAGE,
                    StatusCode::TOO_MANY_REQUESTS.as_u16(),
                )),
            )
                .into_response(),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_MESSAGE).into_response()
            }
            AppError::Mail(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, EMAIL_FAILURE_MESSAGE).into_response()
            }
            AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
