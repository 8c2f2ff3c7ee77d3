//! Ride reservation form

use serde::{Deserialize, Deserializer, Serialize};

use super::require;
use crate::{
    error::{AppError, AppResult},
    mail::EmailMessage,
};

/// Reservation request body
///
/// Missing and `null` fields decode as empty strings and are reported by
/// `validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationForm {
    #[serde(deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub pickup_date_time: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub pickup_location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub dropoff_location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub transport_type: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub trip_type: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ReservationForm {
    /// Decode the first JSON value of a request body
    ///
    /// Anything after that value is ignored; a top-level `null` decodes as an
    /// empty form.
    pub fn from_json(body: &[u8]) -> AppResult<Self> {
        serde_json::Deserializer::from_slice(body)
            .into_iter::<Option<Self>>()
            .next()
            .and_then(Result::ok)
            .map(Option::unwrap_or_default)
            .ok_or_else(|| AppError::BadRequest("Invalid request body".to_string()))
    }

    /// Check required fields, reporting the first one missing
    pub fn validate(&self) -> AppResult<()> {
        require(&self.first_name, "First name is required")?;
        require(&self.last_name, "Last name is required")?;
        require(&self.email, "Email is required")?;
        require(&self.phone, "Phone number is required")?;
        require(&self.pickup_date_time, "Pickup date and time is required")?;
        require(&self.pickup_location, "Pickup location is required")?;
        require(&self.dropoff_location, "Dropoff location is required")?;
        require(&self.transport_type, "Transport type is required")?;
        require(&self.trip_type, "Trip type is required")?;
        Ok(())
    }

    /// Render the notification email
    pub fn to_email(&self) -> EmailMessage {
        let subject = format!("Ride Request - {} {}", self.first_name, self.last_name);
        let body = format!(
            "Name: {} {}\n\
             Email: {}\n\
             Phone: {}\n\
             Pickup Date and Time: {}\n\
             Pickup Location: {}\n\
             Dropoff Location: {}\n\
             Transport Type: {}\n\
             Trip Type: {}",
            self.first_name,
            self.last_name,
            self.email,
            self.phone,
            self.pickup_date_time,
            self.pickup_location,
            self.dropoff_location,
            self.transport_type,
            self.trip_type,
        );

        EmailMessage::new(subject, body)
    }
}
