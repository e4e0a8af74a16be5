//! Bearer-token authentication for the gateway.
//!
//! Tokens are RS256 JWTs issued by the Cognito user pool. Verification keys
//! come from the pool's JWKS endpoint, held in a [`JwksCache`] that is
//! refreshed in the background.
//!
//! Read path: middleware -> [`TokenVerifier`] -> [`keys::resolve`] -> [`JwksCache`].

pub mod error;
pub mod identity;
pub mod jwks;
pub mod jwt;
pub mod keys;

pub use error::AuthError;
pub use identity::{Claims, RequestIdentity};
pub use jwks::{CachedKeySet, JwksCache, JwksError, KeyEntry, KeySet};
pub use jwt::TokenVerifier;
pub use keys::RsaPublicKey;
