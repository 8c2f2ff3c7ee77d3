//! Health check endpoint

use axum::Json;

use crate::response::ApiResponse;

/// Health check endpoint
///
/// Answers 200 whenever the process is serving requests.
pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse::ok("Server is healthy!"))
}
