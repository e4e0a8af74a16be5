//! Authentication failure kinds.
//!
//! Every variant collapses to the same 401 at the response boundary. The
//! distinction exists for logs and metrics only.

use common::jwt::JwtValidationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Token is not well-formed")]
    MalformedToken,

    #[error("Token algorithm {0:?} is not supported")]
    UnsupportedAlgorithm(String),

    #[error("No signing key with kid {0:?}")]
    KeyNotFound(String),

    #[error("Signing key {0:?} cannot be used for RS256")]
    UnusableKey(String),

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,
}

impl AuthError {
    /// Bounded label for logs and the `error_type` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::KeyNotFound(_) => "key_not_found",
            AuthError::UnusableKey(_) => "unusable_key",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::Expired => "expired",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::Expired => AuthError::Expired,
            JwtValidationError::TokenTooLarge
            | JwtValidationError::MalformedToken
            | JwtValidationError::MissingExp => AuthError::MalformedToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_distinct() {
        let kinds = [
            AuthError::MissingHeader.kind(),
            AuthError::MalformedToken.kind(),
            AuthError::UnsupportedAlgorithm("HS256".to_string()).kind(),
            AuthError::KeyNotFound("k".to_string()).kind(),
            AuthError::UnusableKey("k".to_string()).kind(),
            AuthError::SignatureInvalid.kind(),
            AuthError::Expired.kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn test_from_jwt_validation_error() {
        assert_eq!(
            AuthError::from(JwtValidationError::TokenTooLarge),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(JwtValidationError::MalformedToken),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(JwtValidationError::MissingExp),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(JwtValidationError::Expired),
            AuthError::Expired
        );
    }
}
