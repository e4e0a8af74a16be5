//! Builder patterns for test data construction
//!
//! Provides a fluent API for Cognito-shaped access token claims.

use chrono::{Duration, Utc};
use serde_json::{Map, Value};

/// Builder for test JWT claims.
///
/// Defaults to a user `test-user` with no groups and a one hour lifetime.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .in_groups(&["admin", "users"])
///     .expires_in(3600)
///     .build();
/// let token = keypair.sign_token(&claims);
/// ```
pub struct TestTokenBuilder {
    username: Option<String>,
    groups: Option<Vec<String>>,
    exp: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    pub fn new() -> Self {
        Self {
            username: Some("test-user".to_string()),
            groups: None,
            exp: Some((Utc::now() + Duration::seconds(3600)).timestamp()),
            extra: Map::new(),
        }
    }

    /// Set `cognito:username`.
    pub fn for_user(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Set `cognito:groups`.
    pub fn in_groups(mut self, groups: &[&str]) -> Self {
        self.groups = Some(groups.iter().map(|g| g.to_string()).collect());
        self
    }

    /// Set expiration in seconds from now. Negative values produce an
    /// expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Omit `exp` entirely.
    pub fn without_exp(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Omit `cognito:username` entirely.
    pub fn without_username(mut self) -> Self {
        self.username = None;
        self
    }

    /// Add any other claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = self.extra;
        if let Some(username) = self.username {
            claims.insert("cognito:username".to_string(), Value::from(username));
        }
        if let Some(groups) = self.groups {
            claims.insert("cognito:groups".to_string(), Value::from(groups));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), Value::from(exp));
        }
        Value::Object(claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
