//! Form submission endpoints
//!
//! - `POST /api/reservation` - ride reservation (JSON)
//! - `POST /api/application` - job application (multipart, with resume)

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    Json,
};
use tracing::{error, info, instrument};

use crate::{
    error::{AppError, AppResult},
    forms::{ApplicationForm, ReservationForm},
    mail::EmailMessage,
    response::ApiResponse,
    routes::metrics,
    AppState,
};

/// Largest accepted application upload
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Ride reservation endpoint
#[instrument(skip_all)]
pub async fn submit_reservation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<ApiResponse>> {
    let form = ReservationForm::from_json(&body)?;
    form.validate()?;

    relay(&state, "reservation", form.to_email()).await?;

    Ok(Json(ApiResponse::ok(
        "Ride request received! We will get back to you soon.",
    )))
}

/// Job application endpoint
#[instrument(skip_all)]
pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    query: Option<Query<Vec<(String, String)>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse>> {
    let multipart =
        multipart.map_err(|_| AppError::BadRequest("Resume file is required".to_string()))?;
    let query = query.map(|Query(pairs)| pairs).unwrap_or_default();

    let form = ApplicationForm::from_multipart(multipart, &query).await?;
    form.validate()?;

    relay(&state, "application", form.into_email()).await?;

    Ok(Json(ApiResponse::ok(
        "Application received! We will get back to you soon.",
    )))
}

/// Hand a rendered form email to the mailer
async fn relay(state: &AppState, form: &'static str, message: EmailMessage) -> AppResult<()> {
    let subject = message.subject.clone();

    match state.mailer.send(message).await {
        Ok(id) => {
            info!(form, subject = %subject, id = %id, mailer = state.mailer.name(), "Form email sent");
            metrics::record_email(form, "sent");
            Ok(())
        }
        Err(e) => {
            error!(form, error = %e, mailer = state.mailer.name(), "Error sending email");
            metrics::record_email(form, "failed");
            Err(AppError::Mail(e))
        }
    }
}
