//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.

use gateway_service::auth::JwksCache;
use gateway_service::config::Config;
use gateway_service::routes::init_metrics_recorder;
use gateway_service::server::Gateway;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Shared metrics handle. The global recorder can only be installed once
/// per process, so later callers get a standalone recorder's handle.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Configuration for a test gateway fetching keys from `jwks_url`.
pub fn test_config_vars(jwks_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("COGNITO_REGION".to_string(), "us-east-1".to_string()),
        ("COGNITO_POOL_ID".to_string(), "us-east-1_ABC123".to_string()),
        ("COGNITO_JWKS_URL".to_string(), jwks_url.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
    ])
}

/// Test harness running the real gateway startup path.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let keypair = TestKeypair::primary("abc");
///     let jwks = MockJwks::start(&[&keypair]).await;
///     let server = TestGatewayServer::spawn(&jwks.url()).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    jwks: Arc<JwksCache>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Start a gateway on a random port using `jwks_url` as the key source.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(test_config_vars(jwks_url)).await
    }

    /// Start a gateway from explicit environment variables.
    pub async fn spawn_with_vars(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let gateway = Gateway::start(config, test_metrics_handle())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start gateway: {}", e))?;

        let addr = gateway
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;
        let jwks = gateway.jwks();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = gateway.serve(shutdown).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            jwks,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The server's live key set cache.
    pub fn jwks(&self) -> &Arc<JwksCache> {
        &self.jwks
    }

    /// Trigger graceful shutdown and wait for it to finish.
    pub async fn shutdown(mut self) -> Result<(), anyhow::Error> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        (&mut self.handle)
            .await
            .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}
