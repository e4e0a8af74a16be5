//! Verified claims and the request-scoped identity built from them.

use crate::auth::error::AuthError;
use common::secret::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

/// Claim carrying the user name.
pub const USERNAME_CLAIM: &str = "cognito:username";

/// Claim carrying the user's group memberships.
pub const GROUPS_CLAIM: &str = "cognito:groups";

/// Verified token payload.
///
/// Values are kept loosely typed; only the identity claims are interpreted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Authenticated caller, attached to request extensions by the auth
/// middleware.
///
/// The raw token is kept for handlers that exchange it with another service.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub username: String,

    /// Group memberships in token order.
    pub groups: Vec<String>,

    pub raw_token: SecretString,

    /// All claims other than username and groups, unchanged.
    pub extra_claims: Map<String, Value>,
}

impl RequestIdentity {
    /// Map verified claims onto an identity.
    ///
    /// A missing groups claim means no groups.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the username claim is missing
    /// or not a non-empty string, or the groups claim is not a list of strings.
    pub fn from_claims(claims: Claims, raw_token: &str) -> Result<Self, AuthError> {
        let mut extra_claims = claims.into_map();

        let username = match extra_claims.remove(USERNAME_CLAIM) {
            Some(Value::String(username)) if !username.is_empty() => username,
            other => {
                tracing::debug!(
                    target: "gw.auth.jwt",
                    present = other.is_some(),
                    "Token rejected: no string username claim"
                );
                return Err(AuthError::MalformedToken);
            }
        };

        let groups = match extra_claims.remove(GROUPS_CLAIM) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values
                .into_iter()
                .map(|value| match value {
                    Value::String(group) => Ok(group),
                    _ => Err(AuthError::MalformedToken),
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    tracing::debug!(target: "gw.auth.jwt", "Token rejected: non-string group");
                    e
                })?,
            Some(_) => {
                tracing::debug!(target: "gw.auth.jwt", "Token rejected: groups claim is not a list");
                return Err(AuthError::MalformedToken);
            }
        };

        Ok(Self {
            username,
            groups,
            raw_token: SecretString::from(raw_token.to_string()),
            extra_claims,
        })
    }

    pub fn raw_token(&self) -> &str {
        self.raw_token.expose_secret()
    }
}
