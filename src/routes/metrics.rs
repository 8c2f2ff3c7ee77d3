//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder (call once at startup; repeat calls are no-ops)
pub fn init_metrics() -> Result<(), BuildError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| PrometheusBuilder::new().install_recorder())?;
    register_metrics();
    Ok(())
}

/// Describe all custom metrics
fn register_metrics() {
    metrics::describe_counter!(
        "relay_rate_limit_decisions_total",
        "Rate limit checks by outcome"
    );
    metrics::describe_counter!(
        "relay_rate_limit_evictions_total",
        "Client limiters removed after their lifetime elapsed"
    );
    metrics::describe_gauge!(
        "relay_rate_limit_tracked_clients",
        "Number of clients with a live limiter"
    );
    metrics::describe_counter!(
        "relay_emails_sent_total",
        "Form emails handed to the email provider"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping. Empty until
/// `init_metrics` has run.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a rate limit check
pub fn record_rate_limit_decision(decision: &'static str) {
    metrics::counter!("relay_rate_limit_decisions_total", "decision" => decision).increment(1);
}

/// Record a client limiter eviction
pub fn record_eviction() {
    metrics::counter!("relay_rate_limit_evictions_total").increment(1);
}

/// Update the tracked clients gauge
pub fn set_tracked_clients(count: usize) {
    metrics::gauge!("relay_rate_limit_tracked_clients").set(count as f64);
}

/// Record an email send attempt
pub fn record_email(form: &'static str, result: &'static str) {
    metrics::counter!("relay_emails_sent_total", "form" => form, "result" => result).increment(1);
}
