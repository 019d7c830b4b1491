//! API server.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::routes::create_router;
use crate::state::ApiState;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Serve the API at all.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2001
}

impl ApiConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The API server.
pub struct ApiServer {
    config: ApiConfig,
    state: Arc<ApiState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: Arc<ApiState>) -> Self {
        Self { config, state }
    }

    /// Serve until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) -> std::io::Result<()> {
        let addr: SocketAddr = self.config.addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid API address {}: {}", self.config.addr(), e),
            )
        })?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, token).await
    }

    /// Serve on an already bound listener until `token` is cancelled.
    pub async fn serve(&self, listener: TcpListener, token: CancellationToken) -> std::io::Result<()> {
        let app = create_router(Arc::clone(&self.state));

        info!("API server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        info!(
            "API server stopped after {} request(s), uptime {:?}",
            self.state.request_count(),
            self.state.uptime()
        );
        Ok(())
    }
}
