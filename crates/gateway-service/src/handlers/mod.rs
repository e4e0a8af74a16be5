//! HTTP request handlers for the gateway.

pub mod health;
pub mod metrics;
pub mod user_info;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use user_info::get_user_info;
