//! JSON response body shared by every endpoint

use serde::{Deserialize, Serialize};

/// Generic API response
///
/// Serialized as `{"message": "...", "responseCode": 200}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub message: String,
    pub response_code: u16,
}

impl ApiResponse {
    pub fn new(message: impl Into<String>, response_code: u16) -> Self {
        Self {
            message: message.into(),
            response_code,
        }
    }

    /// Response carrying a 200 code
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(message, 200)
    }
}
