//! Observability for the gateway.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
