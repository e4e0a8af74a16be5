//! Liveness and readiness probes.

use crate::routes::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Readiness probe body.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,

    /// Keys in the current snapshot.
    pub jwks_keys: usize,

    /// Seconds since the current snapshot was fetched. Grows while refreshes
    /// are failing.
    pub jwks_age_seconds: i64,
}

/// Handler for GET /health
///
/// Liveness only; returns "OK" while the process is serving.
#[instrument(skip_all, name = "gw.health.check")]
pub async fn health_check() -> &'static str {
    "OK"
}

/// Handler for GET /ready
///
/// A key set is always loaded once the server is listening, so this reports
/// ready together with the snapshot size and age. A stale snapshot does not
/// fail readiness.
///
/// ```json
/// {"status": "ready", "jwks_keys": 2, "jwks_age_seconds": 412}
/// ```
#[instrument(skip_all, name = "gw.health.ready")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let snapshot = state.jwks.get();

    Json(ReadinessResponse {
        status: "ready",
        jwks_keys: snapshot.key_set.len(),
        jwks_age_seconds: snapshot.age_seconds(),
    })
}
