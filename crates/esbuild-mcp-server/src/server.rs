//! HTTP server implementation.
//!
//! This module provides the main [`McpServer`] struct for serving the
//! esbuild tools over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use esbuild_mcp_common::{LoadError, LoadOptions, RuntimeConfig, ServerConfigFile};

use crate::router::build_router;
use crate::state::AppState;

/// Errors raised while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be turned into a server.
    #[error("Invalid server configuration: {message}")]
    InvalidConfig { message: String },

    /// Listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Engine host could not be set up.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server.
    pub bind_addr: SocketAddr,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable graceful shutdown on SIGTERM/SIGINT.
    pub graceful_shutdown: bool,
    /// Start loading the default engine module at startup.
    pub preload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8765)),
            request_timeout_secs: 120,
            graceful_shutdown: true,
            preload: false,
        }
    }
}

impl TryFrom<&ServerConfigFile> for ServerConfig {
    type Error = ServerError;

    fn try_from(file: &ServerConfigFile) -> Result<Self, Self::Error> {
        let bind_addr = file
            .bind_addr
            .parse()
            .map_err(|e| ServerError::InvalidConfig {
                message: format!("bind_addr '{}': {e}", file.bind_addr),
            })?;

        Ok(Self {
            bind_addr,
            request_timeout_secs: file.request_timeout_secs,
            graceful_shutdown: file.graceful_shutdown,
            preload: file.preload,
        })
    }
}

impl ServerConfig {
    /// Create a new server config with custom bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Create a new server config with custom timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Enable or disable the startup load.
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    /// Get the request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// esbuild tool server.
///
/// # Example
///
/// ```ignore
/// use esbuild_mcp_server::{McpServer, ServerConfig};
/// use esbuild_mcp_common::RuntimeConfig;
///
/// let server = McpServer::new(&RuntimeConfig::default(), ServerConfig::default())?;
/// server.run().await?;
/// ```
pub struct McpServer {
    /// Application state.
    state: AppState,
    /// Server configuration.
    config: ServerConfig,
}

impl McpServer {
    /// Create a new server instance.
    ///
    /// No engine module is read here; that happens on the first tool call,
    /// or right after binding when `preload` is set.
    pub fn new(
        runtime_config: &RuntimeConfig,
        server_config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let state = AppState::new(runtime_config)?;

        Ok(Self {
            state,
            config: server_config,
        })
    }

    /// Get a reference to the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind_addr,
                source,
            })?;

        info!(addr = %self.config.bind_addr, "Starting HTTP server");

        if self.config.preload {
            spawn_preload(self.state.clone());
        }

        let app = build_router(self.state, self.config.request_timeout());

        if self.config.graceful_shutdown {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(ServerError::Serve)?;
        } else {
            axum::serve(listener, app)
                .await
                .map_err(ServerError::Serve)?;
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Start the server and return a handle for testing.
    ///
    /// The server binds to an ephemeral port (127.0.0.1:0).
    pub async fn start_test(runtime_config: &RuntimeConfig) -> Result<TestHandle, ServerError> {
        let state = AppState::new(runtime_config)?;
        Self::start_test_with_state(state).await
    }

    /// Like [`McpServer::start_test`], around an existing state.
    pub async fn start_test_with_state(state: AppState) -> Result<TestHandle, ServerError> {
        let app = build_router(state.clone(), Duration::from_secs(30));

        let bind_addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr,
                source,
            })?;

        let addr = listener.local_addr().map_err(ServerError::Serve)?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(TestHandle {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }
}

/// Handle for a test server instance.
pub struct TestHandle {
    /// The address the server is bound to.
    addr: SocketAddr,
    /// Application state.
    state: AppState,
    /// Shutdown signal sender.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Server task handle.
    handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestHandle {
    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Shutdown the server gracefully.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Load the default engine in the background.
///
/// A failure is recorded in the engine state and retried by the next tool
/// call, so it is only logged here.
fn spawn_preload(state: AppState) {
    tokio::spawn(async move {
        match state.manager().load(LoadOptions::default()).await {
            Ok(engine) => info!(version = ?engine.version, "Engine preloaded"),
            Err(e) => warn!(error = %e, "Engine preload failed"),
        }
    });
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
