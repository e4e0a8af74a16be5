//! API gateway
//!
//! Verifies Cognito-issued RS256 bearer tokens in front of the gateway's
//! HTTP API.
//!
//! # Architecture
//!
//! ```text
//! require_auth -> TokenVerifier -> keys::resolve -> JwksCache
//!                                                      ^
//!                                  jwks_refresher -----+  (background)
//! ```
//!
//! # Modules
//!
//! - `auth` - JWKS cache, key resolution, token verification, identity
//! - `config` - Environment configuration
//! - `errors` - HTTP error mapping
//! - `handlers` - Health, readiness, metrics and user-info handlers
//! - `middleware` - Auth gate and HTTP metrics
//! - `observability` - Prometheus metrics
//! - `routes` - Router and shared state
//! - `server` - Startup and shutdown
//! - `tasks` - Background key set refresher

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod tasks;
