//! Rate limiting middleware
//!
//! Throttles every request by the peer's IP address using the token buckets
//! in [`RateLimitRegistry`]. Allowed requests pass through untouched; denied
//! requests get a 429 with a JSON body and never reach the handler.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::clock::Clock;
use tracing::{debug, warn};

use crate::{
    error::AppError,
    limiter::{RateLimitDecision, RateLimitRegistry},
    routes::metrics,
};

/// Derive the client identity from the connection's peer address
///
/// The port is dropped and IPv4-mapped IPv6 addresses are folded back to
/// IPv4, so one host maps to one identity regardless of listener family.
pub fn client_identity(connect_info: Option<&ConnectInfo<SocketAddr>>) -> Result<IpAddr, AppError> {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_canonical())
        .ok_or(AppError::AddressUnavailable)
}

/// Rate limiting middleware
///
/// Requires the server to be run with
/// `into_make_service_with_connect_info::<SocketAddr>()`; without a peer
/// address every request is answered with an empty 500.
pub async fn rate_limit_middleware<C>(
    State(registry): State<Arc<RateLimitRegistry<C>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    C: Clock + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    let client = match client_identity(connect_info.as_ref()) {
        Ok(client) => client,
        Err(e) => {
            warn!(path = %request.uri().path(), "Request has no peer address");
            return Err(e);
        }
    };

    match registry.check(client) {
        RateLimitDecision::Allowed => {
            metrics::record_rate_limit_decision("allowed");
            Ok(next.run(request).await)
        }
        RateLimitDecision::Denied { retry_after } => {
            debug!(
                client = %client,
                path = %request.uri().path(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            metrics::record_rate_limit_decision("denied");
            Err(AppError::RateLimitExceeded)
        }
    }
}
