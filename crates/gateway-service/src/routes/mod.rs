//! HTTP routes for the gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::{JwksCache, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    /// Shared key set, also held by the refresher task.
    pub jwks: Arc<JwksCache>,
}

/// Build the application routes.
///
/// - `/health` - Liveness probe, public
/// - `/ready` - Readiness probe with key set size and age, public
/// - `/metrics` - Prometheus scrape endpoint, public
/// - `/api/v1/user-info` - Authenticated caller's identity
///
/// Every route gets request tracing, a 30 second timeout and HTTP metrics.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let token_verifier = Arc::new(TokenVerifier::new(
        Arc::clone(&state.jwks),
        Duration::from_secs(state.config.jwt_clock_skew_seconds.unsigned_abs()),
    ));
    let auth_state = Arc::new(AuthState { token_verifier });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/user-info", get(handlers::get_user_info))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
