//! Authentication middleware for protected routes.
//!
//! Reads the `Authorization` header, verifies the token, and stores a
//! [`RequestIdentity`] in request extensions for handlers.
//!
//! Per request:
//!
//! ```text
//! Start --header present--> TokenPresent --verify ok--> Verified (next handler)
//!   |                            |
//!   +--absent--> Rejected        +--verify err--> Rejected (401)
//! ```

use crate::auth::{AuthError, RequestIdentity, TokenVerifier};
use crate::errors::GatewayError;
use crate::observability::metrics::record_token_validation;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

const BEARER_SCHEME: &str = "bearer ";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub token_verifier: Arc<TokenVerifier>,
}

/// Pull the credential out of the `Authorization` header.
///
/// A leading `Bearer ` (any case) is removed. Without it the whole header
/// value is taken as the token.
///
/// # Errors
///
/// Returns `AuthError::MissingHeader` if the header is absent, not valid
/// visible ASCII, or blank.
pub fn extract_credential(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    // Scheme with no credential
    if value.eq_ignore_ascii_case(BEARER_SCHEME.trim_end()) {
        return Err(AuthError::MissingHeader);
    }

    let token = match value.get(..BEARER_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            value.get(BEARER_SCHEME.len()..).unwrap_or_default().trim_start()
        }
        _ => value,
    };

    if token.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    Ok(token)
}

/// Run the full gate for one request: extract, verify, build identity.
///
/// # Errors
///
/// Returns the [`AuthError`] for the first failing stage.
pub fn authenticate(
    verifier: &TokenVerifier,
    headers: &HeaderMap,
) -> Result<RequestIdentity, AuthError> {
    let token = extract_credential(headers)?;
    let claims = verifier.verify(token)?;
    RequestIdentity::from_claims(claims, token)
}

/// Authentication middleware that rejects any request without a valid token.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` if the token is missing or invalid. The
///   reason is logged at debug level and never returned to the caller.
/// - Otherwise the next handler runs with a [`RequestIdentity`] in
///   extensions.
#[instrument(skip_all, name = "gw.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let identity = match authenticate(&state.token_verifier, req.headers()) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::debug!(
                target: "gw.middleware.auth",
                error_type = err.kind(),
                error = %err,
                "Request rejected"
            );
            record_token_validation("error", Some(err.kind()));
            return Err(err.into());
        }
    };

    record_token_validation("success", None);
    tracing::info!(
        target: "gw.middleware.auth",
        username = %identity.username,
        "Validated token for user"
    );

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
