//! Rate limiting integration tests
//!
//! Tests for the per-client rate limiting middleware:
//! - Burst of 3 followed by 429 with the structured body
//! - Refill of one token per 5 seconds, capped at the burst
//! - Per-address isolation
//! - No double-spend under concurrent requests
//! - Eviction 60 seconds after a client's first request
//! - Requests without a peer address

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use form_relay::{RateLimitPolicy, RateLimitRegistry};
use governor::clock::FakeRelativeClock;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use crate::common::{
    app_with_mailer, body_string, constants, counting_router, get_from, RecordingMailer,
};

const CLIENT_A: [u8; 4] = [10, 0, 0, 1];
const CLIENT_B: [u8; 4] = [10, 0, 0, 2];

fn fake_clock_registry() -> (Arc<RateLimitRegistry<FakeRelativeClock>>, FakeRelativeClock) {
    let clock = FakeRelativeClock::default();
    let registry = Arc::new(RateLimitRegistry::with_clock(
        RateLimitPolicy::default(),
        clock.clone(),
    ));
    (registry, clock)
}

async fn status_of(app: &axum::Router, ip: [u8; 4]) -> StatusCode {
    app.clone()
        .oneshot(get_from(ip, "/api/test"))
        .await
        .unwrap()
        .status()
}

// =============================================================================
// Burst and rejection
// =============================================================================

#[tokio::test]
async fn test_first_three_requests_allowed_fourth_denied() {
    let (app, _state) = app_with_mailer(Arc::new(RecordingMailer::default()));

    for i in 0..3 {
        let response = app.clone().oneshot(get_from(CLIENT_A, "/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let response = app.clone().oneshot(get_from(CLIENT_A, "/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_string(response).await, constants::RATE_LIMIT_BODY);
}

#[tokio::test]
async fn test_denied_requests_never_reach_handler() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, hits) = counting_router(registry);

    let mut statuses = Vec::new();
    for _ in 0..6 {
        statuses.push(status_of(&app, CLIENT_A).await);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_allowed_response_is_untouched() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, _hits) = counting_router(registry);

    let response = app.clone().oneshot(get_from(CLIENT_A, "/api/test")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::RETRY_AFTER).is_none());
    assert!(response.headers().get("x-ratelimit-limit").is_none());
    assert_eq!(body_string(response).await, "handled");
}

#[tokio::test]
async fn test_source_port_is_ignored() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, _hits) = counting_router(registry.clone());

    for port in [1000u16, 2000, 3000, 4000] {
        let mut request = Request::builder()
            .uri("/api/test")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(axum::extract::ConnectInfo(std::net::SocketAddr::from((
                CLIENT_A, port,
            ))));
        let status = app.clone().oneshot(request).await.unwrap().status();

        let expected = if port == 4000 {
            StatusCode::TOO_MANY_REQUESTS
        } else {
            StatusCode::OK
        };
        assert_eq!(status, expected);
    }

    assert_eq!(registry.len(), 1);
}

// =============================================================================
// Refill
// =============================================================================

#[tokio::test]
async fn test_one_request_allowed_after_five_seconds() {
    let (registry, clock) = fake_clock_registry();
    let (app, _hits) = counting_router(registry);

    for _ in 0..3 {
        assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::OK);
    }
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::TOO_MANY_REQUESTS);

    clock.advance(Duration::from_secs(5));

    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::OK);
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_long_wait_restores_at_most_burst() {
    let (registry, clock) = fake_clock_registry();
    let (app, hits) = counting_router(registry);

    for _ in 0..4 {
        status_of(&app, CLIENT_A).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    clock.advance(Duration::from_secs(40));

    for _ in 0..5 {
        status_of(&app, CLIENT_A).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_example_scenario() {
    let (registry, clock) = fake_clock_registry();
    let (app, _hits) = counting_router(registry);

    // Both clients start at t=0
    for _ in 0..3 {
        assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::OK);
    }
    assert_eq!(status_of(&app, CLIENT_B).await, StatusCode::OK);

    let response = app.clone().oneshot(get_from(CLIENT_A, "/api/test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_string(response).await, constants::RATE_LIMIT_BODY);

    clock.advance(Duration::from_secs(5));
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::OK);
}

// =============================================================================
// Isolation and concurrency
// =============================================================================

#[tokio::test]
async fn test_clients_have_independent_quotas() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, _hits) = counting_router(registry.clone());

    for _ in 0..5 {
        status_of(&app, CLIENT_A).await;
    }
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::TOO_MANY_REQUESTS);

    for _ in 0..3 {
        assert_eq!(status_of(&app, CLIENT_B).await, StatusCode::OK);
    }

    assert_eq!(registry.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_from_one_client() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, hits) = counting_router(registry);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                app.oneshot(get_from(CLIENT_A, "/api/test"))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut allowed = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => allowed += 1,
            StatusCode::TOO_MANY_REQUESTS => denied += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(allowed, 3);
    assert_eq!(denied, 17);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_from_many_clients() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, hits) = counting_router(registry.clone());

    let handles: Vec<_> = (1..=8u8)
        .flat_map(|last| std::iter::repeat(last).take(5))
        .map(|last| {
            let app = app.clone();
            tokio::spawn(async move {
                let status = app
                    .oneshot(get_from([10, 0, 1, last], "/api/test"))
                    .await
                    .unwrap()
                    .status();
                (last, status)
            })
        })
        .collect();

    let mut allowed_per_client = [0usize; 9];
    for handle in handles {
        let (last, status) = handle.await.unwrap();
        if status == StatusCode::OK {
            allowed_per_client[last as usize] += 1;
        }
    }

    assert!(allowed_per_client[1..].iter().all(|&allowed| allowed == 3));
    assert_eq!(hits.load(Ordering::SeqCst), 24);
    assert_eq!(registry.len(), 8);
}

// =============================================================================
// Eviction
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_evicted_client_gets_fresh_burst() {
    let (registry, _clock) = fake_clock_registry();
    let (app, _hits) = counting_router(registry.clone());

    for _ in 0..3 {
        assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::OK);
    }
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(registry.is_empty());

    for _ in 0..3 {
        assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::OK);
    }
    assert_eq!(status_of(&app, CLIENT_A).await, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test(start_paused = true)]
async fn test_eviction_is_per_client() {
    let (registry, _clock) = fake_clock_registry();
    let (app, _hits) = counting_router(registry.clone());

    status_of(&app, CLIENT_A).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    status_of(&app, CLIENT_B).await;

    tokio::time::sleep(Duration::from_secs(31)).await;

    let a = IpAddr::V4(Ipv4Addr::from(CLIENT_A));
    let b = IpAddr::V4(Ipv4Addr::from(CLIENT_B));
    assert!(!registry.contains(&a));
    assert!(registry.contains(&b));
}

// =============================================================================
// Missing peer address
// =============================================================================

#[tokio::test]
async fn test_request_without_peer_address_is_server_error() {
    let registry = Arc::new(RateLimitRegistry::default());
    let (app, hits) = counting_router(registry.clone());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/test")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty());
}

// =============================================================================
// CORS preflight
// =============================================================================

#[tokio::test]
async fn test_preflight_does_not_consume_tokens() {
    let (app, state) = app_with_mailer(Arc::new(RecordingMailer::default()));

    for _ in 0..5 {
        let mut request = get_from(CLIENT_A, "/api/reservation");
        *request.method_mut() = Method::OPTIONS;
        let headers = request.headers_mut();
        headers.insert(header::ORIGIN, constants::TEST_REACT_URL.parse().unwrap());
        headers.insert(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            "POST".parse().unwrap(),
        );

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            constants::TEST_REACT_URL
        );
    }

    assert!(state.rate_limiter.is_empty());

    for _ in 0..3 {
        let response = app.clone().oneshot(get_from(CLIENT_A, "/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
