//! Mock Cognito JWKS endpoint backed by wiremock.

use crate::crypto_fixtures::TestKeypair;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path Cognito serves the key set under for the test user pool.
pub const JWKS_PATH: &str = "/us-east-1_ABC123/.well-known/jwks.json";

/// A running mock JWKS endpoint whose response can be swapped mid-test.
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    /// Serve a key set containing `keys`.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        let mock = Self {
            server: MockServer::start().await,
        };
        mock.serve_keys(keys).await;
        mock
    }

    /// Serve `status` with an empty body.
    pub async fn start_failing(status: u16) -> Self {
        let mock = Self {
            server: MockServer::start().await,
        };
        mock.serve_status(status).await;
        mock
    }

    /// Full JWKS URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Replace the response with a key set containing `keys`.
    pub async fn serve_keys(&self, keys: &[&TestKeypair]) {
        self.serve_body(jwks_body(keys)).await;
    }

    /// Replace the response with an arbitrary JSON body.
    pub async fn serve_body(&self, body: Value) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Replace the response with an HTTP error.
    pub async fn serve_status(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Replace the response with one that arrives after `delay`.
    pub async fn serve_keys_slowly(&self, keys: &[&TestKeypair], delay: Duration) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_body(keys))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of key set requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// JWKS document for `keys`.
pub fn jwks_body(keys: &[&TestKeypair]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_keys() {
        let keypair = TestKeypair::primary("abc");
        let mock = MockJwks::start(&[&keypair]).await;

        let body: Value = reqwest::get(mock.url()).await.unwrap().json().await.unwrap();

        assert_eq!(body["keys"][0]["kid"], "abc");
        assert_eq!(mock.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_can_switch_to_failure() {
        let keypair = TestKeypair::primary("abc");
        let mock = MockJwks::start(&[&keypair]).await;

        mock.serve_status(503).await;

        let response = reqwest::get(mock.url()).await.unwrap();
        assert_eq!(response.status(), 503);
    }
}
