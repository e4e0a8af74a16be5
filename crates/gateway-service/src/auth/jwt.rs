//! RS256 token verification against the cached key set.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Structure (size, three base64url segments, JSON header and payload)
//! 2. Header `alg` must be exactly "RS256"
//! 3. Header `kid` must name a key in the current snapshot
//! 4. Signature over `header.payload`
//! 5. `exp` must be present and in the future
//!
//! The algorithm is never taken from the token to choose a verification
//! method. Anything other than RS256 is rejected before a key is looked up.

use crate::auth::error::AuthError;
use crate::auth::identity::Claims;
use crate::auth::jwks::{JwksCache, KeySet};
use crate::auth::keys;
use common::jwt::{extract_exp, parse_compact, validate_exp_at, MAX_CLOCK_SKEW};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The only accepted signing algorithm.
pub const ACCEPTED_ALGORITHM: &str = "RS256";

/// Verifies bearer tokens using the shared [`JwksCache`].
pub struct TokenVerifier {
    jwks: Arc<JwksCache>,
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier. `clock_skew` is capped at `MAX_CLOCK_SKEW`.
    pub fn new(jwks: Arc<JwksCache>, clock_skew: Duration) -> Self {
        Self {
            jwks,
            clock_skew: clock_skew.min(MAX_CLOCK_SKEW),
        }
    }

    pub fn jwks(&self) -> &Arc<JwksCache> {
        &self.jwks
    }

    /// Verify a compact token and return its claims.
    ///
    /// Takes one key set snapshot for the whole verification.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AuthError`].
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let snapshot = self.jwks.get();
        verify_token(
            token,
            &snapshot.key_set,
            self.clock_skew,
            chrono::Utc::now().timestamp(),
        )
    }
}

/// Verify `token` against `key_set` at time `now` (Unix seconds).
///
/// # Errors
///
/// - `MalformedToken` - Structure is invalid, or `exp` is missing
/// - `UnsupportedAlgorithm` - Header `alg` is not RS256
/// - `KeyNotFound` - Header has no `kid`, or it is not in `key_set`
/// - `UnusableKey` - The matching entry cannot verify RS256
/// - `SignatureInvalid` - Signature does not match
/// - `Expired` - `exp + clock_skew <= now`
pub fn verify_token(
    token: &str,
    key_set: &KeySet,
    clock_skew: Duration,
    now: i64,
) -> Result<Claims, AuthError> {
    let jwt = parse_compact(token)?;

    if jwt.header.alg != ACCEPTED_ALGORITHM {
        tracing::debug!(target: "gw.auth.jwt", alg = %jwt.header.alg, "Token rejected: unsupported algorithm");
        return Err(AuthError::UnsupportedAlgorithm(jwt.header.alg));
    }

    let kid = jwt.header.kid.as_deref().ok_or_else(|| {
        tracing::debug!(target: "gw.auth.jwt", "Token rejected: missing kid");
        AuthError::KeyNotFound(String::new())
    })?;

    let key = keys::resolve(key_set, kid)?;

    key.verify_rs256(jwt.signing_input.as_bytes(), jwt.signature)
        .map_err(|e| {
            tracing::debug!(target: "gw.auth.jwt", kid = %kid, "Token rejected: signature mismatch");
            e
        })?;

    let exp = extract_exp(&jwt.payload)?;
    validate_exp_at(exp, clock_skew, now)?;

    Ok(Claims::new(jwt.payload))
}
