//! Form submissions
//!
//! Decoding, validation and email rendering for the reservation and
//! application forms.

pub mod application;
pub mod reservation;

pub use self::application::ApplicationForm;
pub use self::reservation::ReservationForm;

use crate::error::{AppError, AppResult};

/// Reject an empty required field with its user-facing message
fn require(value: &str, message: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(())
}
