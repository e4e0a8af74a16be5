//! Current user handler.
//!
//! Returns the identity the auth middleware attached to the request.

use crate::auth::RequestIdentity;
use crate::errors::GatewayError;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Clone, Serialize)]
pub struct UserInfoResponse {
    pub data: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub groups: Vec<String>,
}

/// Handler for GET /api/v1/user-info
///
/// ```json
/// {"data": {"username": "alice", "groups": ["admin", "users"]}}
/// ```
///
/// Returns 500 if reached without the auth middleware having run.
#[instrument(skip_all, name = "gw.handlers.user_info")]
pub async fn get_user_info(
    identity: Option<Extension<RequestIdentity>>,
) -> Result<Json<UserInfoResponse>, GatewayError> {
    let Some(Extension(identity)) = identity else {
        tracing::error!(target: "gw.handlers.user_info", "No identity on a protected route");
        return Err(GatewayError::Internal);
    };

    Ok(Json(UserInfoResponse {
        data: UserInfo {
            username: identity.username,
            groups: identity.groups,
        },
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use common::secret::SecretString;

    fn identity() -> RequestIdentity {
        RequestIdentity {
            username: "alice".to_string(),
            groups: vec!["admin".to_string(), "users".to_string()],
            raw_token: SecretString::from("t"),
            extra_claims: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_get_user_info_returns_identity() {
        let Json(response) = get_user_info(Some(Extension(identity()))).await.unwrap();

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"data": {"username": "alice", "groups": ["admin", "users"]}})
        );
    }

    #[tokio::test]
    async fn test_get_user_info_without_identity() {
        let result = get_user_info(None).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
