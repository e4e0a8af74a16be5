//! Public endpoint tests: liveness, readiness, metrics.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use gateway_test_utils::*;

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let keypair = TestKeypair::primary("abc");
    let jwks = MockJwks::start(&[&keypair]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_ready_reports_key_set() -> Result<()> {
    let first = TestKeypair::primary("key-1");
    let second = TestKeypair::secondary("key-2");
    let jwks = MockJwks::start(&[&first, &second]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["jwks_keys"], 2);
    assert!(body["jwks_age_seconds"].as_i64().unwrap() >= 0);

    Ok(())
}

#[tokio::test]
async fn test_ready_while_refresh_is_failing() -> Result<()> {
    let keypair = TestKeypair::primary("abc");
    let jwks = MockJwks::start(&[&keypair]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;

    jwks.serve_status(503).await;
    assert!(server.jwks().refresh().await.is_err());

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["jwks_keys"], 1);

    Ok(())
}

#[tokio::test]
async fn test_public_endpoints_ignore_authorization() -> Result<()> {
    let keypair = TestKeypair::primary("abc");
    let jwks = MockJwks::start(&[&keypair]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;
    let client = reqwest::Client::new();

    for endpoint in ["/health", "/ready", "/metrics"] {
        let response = client
            .get(format!("{}{}", server.url(), endpoint))
            .bearer_auth("not-a-token")
            .send()
            .await?;
        assert_eq!(response.status(), 200, "endpoint {endpoint}");
    }

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_text() -> Result<()> {
    let keypair = TestKeypair::primary("abc");
    let jwks = MockJwks::start(&[&keypair]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;

    // Generate at least one request before scraping
    reqwest::get(format!("{}/health", server.url())).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), 200);
    // Body content depends on whether this process owns the global recorder
    let _ = response.text().await?;

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let keypair = TestKeypair::primary("abc");
    let jwks = MockJwks::start(&[&keypair]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;

    let response = reqwest::get(format!("{}/api/v1/unknown", server.url())).await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_graceful_shutdown() -> Result<()> {
    let keypair = TestKeypair::primary("abc");
    let jwks = MockJwks::start(&[&keypair]).await;
    let server = TestGatewayServer::spawn(&jwks.url()).await?;
    let addr = server.addr();

    server.shutdown().await?;

    assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());

    Ok(())
}
