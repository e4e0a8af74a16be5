//! JWT utilities shared across gateway services.
//!
//! This module provides the low-level pieces of bearer token validation:
//! - Size limits for DoS prevention
//! - Compact serialization parsing (header, payload, signature segments)
//! - RSA public key component decoding from JWK `n`/`e` fields
//! - Explicit `exp` validation with clock skew tolerance
//!
//! Signature verification and key selection live in the service crate; nothing
//! here trusts a token. A [`CompactJwt`] is only a structural decode.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - All three segments are decoded up front so malformed input fails fast
//! - `exp` is checked explicitly rather than through a library default
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{parse_compact, extract_exp, validate_exp, DEFAULT_CLOCK_SKEW};
//!
//! let jwt = parse_compact(token)?;
//! // ... select key by jwt.header.kid and verify jwt.signing_input ...
//! validate_exp(extract_exp(&jwt.payload)?, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected before any base64 decoding or
/// cryptographic work. Identity-provider ID and access tokens are typically
/// 1-2KB, group-heavy tokens stay well under 8KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default leeway applied to the `exp` claim.
///
/// Zero: a token is rejected at the exact second it expires.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that would keep expired tokens usable.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Largest RSA public exponent accepted, in bytes.
pub const MAX_RSA_EXPONENT_BYTES: usize = 4;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while structurally validating a JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (segment count, base64url or JSON).
    #[error("Token is not a well-formed compact JWT")]
    MalformedToken,

    /// Token has no numeric `exp` claim.
    #[error("Token is missing a numeric exp claim")]
    MissingExp,

    /// Token `exp` claim is in the past.
    #[error("Token has expired")]
    Expired,
}

/// Errors that can occur while decoding RSA key components from a JWK.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterialError {
    /// Component is not valid unpadded base64url.
    #[error("Key component is not valid base64url: {0}")]
    InvalidEncoding(String),

    /// Component decoded to nothing (or to zero).
    #[error("Key component is empty or zero")]
    Empty,

    /// Exponent does not fit in 32 bits.
    #[error("RSA exponent is {0} bytes, at most 4 are supported")]
    ExponentTooLarge(usize),
}

// =============================================================================
// Compact Token
// =============================================================================

/// Decoded JOSE header.
///
/// Only the fields the gateway acts on are kept. `alg` is kept as a raw
/// string so that unknown algorithms can be reported as unsupported rather
/// than as a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtHeader {
    /// Declared signing algorithm.
    pub alg: String,

    /// Key ID selecting the verification key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Token type, usually "JWT".
    #[serde(default)]
    pub typ: Option<String>,
}

/// A compact JWT split into its decoded parts. Nothing here is verified.
#[derive(Debug, Clone)]
pub struct CompactJwt<'a> {
    /// Decoded header.
    pub header: JwtHeader,

    /// Decoded payload as an untyped claim map.
    pub payload: Map<String, Value>,

    /// `<header>.<payload>` exactly as received; the bytes the signature covers.
    pub signing_input: &'a str,

    /// Signature segment, still base64url-encoded.
    pub signature: &'a str,
}

// =============================================================================
// Functions
// =============================================================================

/// Split and decode a compact JWT without verifying it.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not exactly three segments, a segment is not valid
///   base64url, the header is not a JSON object with a string `alg`, the
///   payload is not a JSON object, or the signature is empty
pub fn parse_compact(token: &str) -> Result<CompactJwt<'_>, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let (signing_input, signature) = token.rsplit_once('.').ok_or_else(|| {
        tracing::debug!(target: "common.jwt", "Token rejected: no segment separator");
        JwtValidationError::MalformedToken
    })?;
    let (header_b64, payload_b64) = signing_input.split_once('.').ok_or_else(|| {
        tracing::debug!(target: "common.jwt", "Token rejected: only two segments");
        JwtValidationError::MalformedToken
    })?;
    if payload_b64.contains('.') {
        tracing::debug!(target: "common.jwt", "Token rejected: more than three segments");
        return Err(JwtValidationError::MalformedToken);
    }

    let header_bytes = decode_segment(header_b64, "header")?;
    let header: JwtHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let payload_bytes = decode_segment(payload_b64, "payload")?;
    let payload: Map<String, Value> = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtValidationError::MalformedToken
    })?;

    if decode_segment(signature, "signature")?.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty signature");
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(CompactJwt {
        header,
        payload,
        signing_input,
        signature,
    })
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

/// Decode an RSA modulus from a JWK `n` field (base64url, no padding).
///
/// Leading zero bytes are stripped so the result is the minimal big-endian
/// encoding of the unsigned integer.
///
/// # Errors
///
/// - `InvalidEncoding` - Not valid unpadded base64url
/// - `Empty` - Decodes to nothing or to zero
pub fn decode_rsa_modulus(n_b64url: &str) -> Result<Vec<u8>, KeyMaterialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(n_b64url)
        .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?;

    let first_significant = bytes
        .iter()
        .position(|b| *b != 0)
        .ok_or(KeyMaterialError::Empty)?;

    Ok(bytes.get(first_significant..).unwrap_or_default().to_vec())
}

/// Decode an RSA public exponent from a JWK `e` field (base64url, no padding).
///
/// Exponents shorter than four bytes are left-padded with zeros before being
/// read as a big-endian `u32`, so the usual three-byte `AQAB` yields 65537.
///
/// # Errors
///
/// - `InvalidEncoding` - Not valid unpadded base64url
/// - `Empty` - Decodes to nothing or to zero
/// - `ExponentTooLarge` - More than `MAX_RSA_EXPONENT_BYTES` bytes
pub fn decode_rsa_exponent(e_b64url: &str) -> Result<u32, KeyMaterialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(e_b64url)
        .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?;

    if bytes.is_empty() {
        return Err(KeyMaterialError::Empty);
    }
    if bytes.len() > MAX_RSA_EXPONENT_BYTES {
        return Err(KeyMaterialError::ExponentTooLarge(bytes.len()));
    }

    let mut padded = [0u8; MAX_RSA_EXPONENT_BYTES];
    let offset = MAX_RSA_EXPONENT_BYTES - bytes.len();
    if let Some(tail) = padded.get_mut(offset..) {
        tail.copy_from_slice(&bytes);
    }

    match u32::from_be_bytes(padded) {
        0 => Err(KeyMaterialError::Empty),
        exponent => Ok(exponent),
    }
}

/// Read the `exp` claim as Unix epoch seconds.
///
/// Fractional values (permitted by RFC 7519 NumericDate) are truncated
/// toward negative infinity.
///
/// # Errors
///
/// Returns `JwtValidationError::MissingExp` if `exp` is absent or not a number.
pub fn extract_exp(claims: &Map<String, Value>) -> Result<i64, JwtValidationError> {
    let exp = claims.get("exp").ok_or(JwtValidationError::MissingExp)?;

    if let Some(seconds) = exp.as_i64() {
        return Ok(seconds);
    }

    match exp.as_f64() {
        // Safe cast: finite NumericDate values far exceed any real token lifetime
        #[allow(clippy::cast_possible_truncation)]
        Some(seconds) if seconds.is_finite() => Ok(seconds.floor() as i64),
        _ => Err(JwtValidationError::MissingExp),
    }
}

/// Validate the `exp` claim against the current time.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` if `exp + clock_skew` is not in the
/// future.
pub fn validate_exp(exp: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_exp_at(exp, clock_skew, now)
}

/// Deterministic `exp` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_exp`] in production code. This variant exists so that
/// boundary conditions can be tested without wall-clock dependence.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` if `exp + clock_skew <= now`.
pub fn validate_exp_at(
    exp: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let expires_at = exp.saturating_add(clock_skew_secs);

    if expires_at <= now {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
