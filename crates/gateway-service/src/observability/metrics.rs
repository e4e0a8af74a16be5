//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods only
//! - `endpoint`: known paths, everything else is `/other`
//! - `status`: success, error, timeout
//! - `error_type`: bounded by `AuthError::kind()`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gw_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetches cross the network to the identity provider
        .set_buckets_for_metric(
            Matcher::Prefix("gw_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `gw_http_requests_total`, `gw_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gw_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gw_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a fixed label set.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/user-info" => "/api/v1/user-info",
        _ => "/other",
    }
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS fetch attempt.
///
/// Metric: `gw_jwks_refresh_total`, `gw_jwks_refresh_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_refresh(status: &'static str, duration: Duration) {
    histogram!("gw_jwks_refresh_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("gw_jwks_refresh_total", "status" => status).increment(1);
}

/// Set the number of keys in the currently published key set.
///
/// Metric: `gw_jwks_keys`
#[allow(clippy::cast_precision_loss)]
pub fn set_jwks_key_count(count: usize) {
    gauge!("gw_jwks_keys").set(count as f64);
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record the outcome of a bearer-token validation.
///
/// Metric: `gw_token_validations_total`
/// Labels: `status` (success, error), `error_type` (`none` on success)
pub fn record_token_validation(status: &'static str, error_type: Option<&'static str>) {
    counter!("gw_token_validations_total",
        "status" => status,
        "error_type" => error_type.unwrap_or("none")
    )
    .increment(1);
}
