//! Process lifecycle: load keys, start the refresher, serve, shut down.
//!
//! The listener is only bound after the initial key set has been fetched,
//! so no request is ever accepted without keys.

use crate::auth::{JwksCache, JwksError};
use crate::config::Config;
use crate::routes::{self, AppState};
use crate::tasks::start_jwks_refresher;
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load JWKS: {0}")]
    Jwks(#[from] JwksError),

    #[error("Invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A gateway that has its key set and a bound listener, ready to serve.
pub struct Gateway {
    listener: TcpListener,
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    cancel_token: CancellationToken,
    refresher: JoinHandle<()>,
}

impl Gateway {
    /// Fetch the initial key set, bind the listener and start the refresher.
    ///
    /// # Errors
    ///
    /// - `Jwks` - The initial key set could not be loaded
    /// - `InvalidBindAddress` / `Io` - The listener could not be bound
    pub async fn start(
        config: Config,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self, StartupError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|_| StartupError::InvalidBindAddress(config.bind_address.clone()))?;

        let jwks = Arc::new(
            JwksCache::initialize(config.jwks_url.clone(), config.jwks_fetch_timeout).await?,
        );

        let listener = TcpListener::bind(addr).await?;

        let cancel_token = CancellationToken::new();
        let refresher = tokio::spawn(start_jwks_refresher(
            Arc::clone(&jwks),
            config.jwks_refresh_interval,
            cancel_token.clone(),
        ));

        Ok(Self {
            listener,
            state: Arc::new(AppState { config, jwks }),
            metrics_handle,
            cancel_token,
            refresher,
        })
    }

    /// # Errors
    ///
    /// Returns `Io` if the listener address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, StartupError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn jwks(&self) -> Arc<JwksCache> {
        Arc::clone(&self.state.jwks)
    }

    /// Serve until `shutdown` resolves, then stop the refresher.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the server fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = routes::build_routes(self.state, self.metrics_handle);

        if let Ok(addr) = self.listener.local_addr() {
            info!("Gateway listening on {}", addr);
        }

        let served = axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        self.cancel_token.cancel();
        if let Err(e) = self.refresher.await {
            error!(error = %e, "JWKS refresher task failed");
        }

        served.map_err(StartupError::from)
    }
}
