//! HTTP routes for the form relay
//!
//! This module defines all HTTP endpoints exposed by the server.

pub mod health;
pub mod metrics;
pub mod submissions;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use governor::clock::DefaultClock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{middleware::rate_limiter::rate_limit_middleware, AppState};

/// Create the main application router
///
/// Every route sits behind the rate limiter. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.react_url.as_deref());

    Router::new()
        .route("/api/health", get(health::health_check))
        .route(
            "/api/application",
            post(submissions::submit_application)
                .layer(DefaultBodyLimit::max(submissions::MAX_UPLOAD_BYTES)),
        )
        .route("/api/reservation", post(submissions::submit_reservation))
        .route("/metrics", get(metrics::prometheus_metrics))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware::<DefaultClock>,
        ))
        // Global middleware; CORS answers preflights before rate limiting
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy allowing the configured frontend origin only
fn cors_layer(react_url: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match react_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(e)) => {
            warn!(error = %e, "REACT_URL is not a valid origin; cross-origin requests disabled");
            cors
        }
        None => cors,
    }
}
