//! Background tasks for the gateway.
//!
//! - `jwks_refresher` - Periodically refreshes the JWKS cache

pub mod jwks_refresher;

pub use jwks_refresher::start_jwks_refresher;
