//! Gateway configuration.
//!
//! Configuration is loaded from environment variables. The user-pool identifier
//! is redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Default key set refresh interval in seconds (30 minutes).
pub const DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS: u64 = 1800;

/// Upper bound for the key set refresh interval in seconds (one day).
pub const MAX_JWKS_REFRESH_INTERVAL_SECONDS: u64 = 86_400;

/// Default timeout for a single JWKS fetch in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS fetch timeout in seconds.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 120;

/// Deployment stage. Selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Human-readable logs.
    Beta,
    /// JSON logs.
    Prod,
}

impl Stage {
    /// Read `STAGE` directly. Used before the full configuration is loaded
    /// so that logging is available for configuration errors.
    pub fn from_env() -> Self {
        env::var("STAGE")
            .map(|s| Self::parse(&s))
            .unwrap_or(Stage::Beta)
    }

    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("prod") {
            Stage::Prod
        } else {
            Stage::Beta
        }
    }
}

/// Build the JWKS URL for a Cognito user pool.
pub fn cognito_jwks_url(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}/.well-known/jwks.json")
}

/// Gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Identity-provider region (e.g., "us-east-1").
    pub cognito_region: String,

    /// Identity-provider user pool ID (e.g., "us-east-1_ABC123").
    pub cognito_pool_id: String,

    /// URL the key set is fetched from. Derived from region and pool unless
    /// `COGNITO_JWKS_URL` overrides it.
    pub jwks_url: String,

    /// Server bind address (default: "127.0.0.1:8080").
    pub bind_address: String,

    /// Deployment stage.
    pub stage: Stage,

    /// Interval between background key set refreshes.
    pub jwks_refresh_interval: Duration,

    /// Timeout applied to each outbound JWKS fetch.
    pub jwks_fetch_timeout: Duration,

    /// Leeway in seconds applied to the `exp` claim.
    pub jwt_clock_skew_seconds: i64,
}

/// Custom Debug implementation that redacts the pool identifier.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("cognito_region", &self.cognito_region)
            .field("cognito_pool_id", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("stage", &self.stage)
            .field("jwks_refresh_interval", &self.jwks_refresh_interval)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS refresh interval configuration: {0}")]
    InvalidRefreshInterval(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let cognito_region = required(vars, "COGNITO_REGION")?;
        let cognito_pool_id = required(vars, "COGNITO_POOL_ID")?;

        let jwks_url = vars
            .get("COGNITO_JWKS_URL")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| cognito_jwks_url(&cognito_region, &cognito_pool_id));

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let stage = vars
            .get("STAGE")
            .map(|s| Stage::parse(s))
            .unwrap_or(Stage::Beta);

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value < 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not be negative, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let refresh_secs = if let Some(value_str) = vars.get("JWKS_REFRESH_INTERVAL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRefreshInterval(format!(
                    "JWKS_REFRESH_INTERVAL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_JWKS_REFRESH_INTERVAL_SECONDS {
                return Err(ConfigError::InvalidRefreshInterval(format!(
                    "JWKS_REFRESH_INTERVAL_SECONDS must be between 1 and {}, got {}",
                    MAX_JWKS_REFRESH_INTERVAL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS
        };

        let timeout_secs = if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                    MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
        };

        Ok(Config {
            cognito_region,
            cognito_pool_id,
            jwks_url,
            bind_address,
            stage,
            jwks_refresh_interval: Duration::from_secs(refresh_secs),
            jwks_fetch_timeout: Duration::from_secs(timeout_secs),
            jwt_clock_skew_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}
