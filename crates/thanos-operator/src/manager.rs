//! # Kubernetes Operator Manager
//!
//! Runs the controller next to the health endpoint until shutdown

use crate::{OperatorConfig, ThanosController};
use axum::{routing::get, Router};
use kube::Client;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main operator manager
pub struct OperatorManager {
    config: OperatorConfig,
    client: Client,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl OperatorManager {
    /// Create a manager connected to the inferred cluster
    pub async fn new(config: OperatorConfig) -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: OperatorConfig, client: Client) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            config,
            client,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle that stops a running manager when sent to.
    ///
    /// Sends made before [`OperatorManager::run`] is called are not lost.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Start the operator and block until a shutdown signal arrives
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Starting Thanos operator v{}", env!("CARGO_PKG_VERSION"));
        info!("Configuration: {:?}", self.config);

        let controller = ThanosController::new(self.client.clone(), self.config.clone());
        let controller_handle = tokio::spawn(controller.run());
        let health_handle = self.start_health_server();

        self.wait_for_shutdown().await?;

        info!("Shutdown signal received, stopping operator...");
        controller_handle.abort();
        health_handle.abort();

        info!("Thanos operator stopped");
        Ok(())
    }

    fn start_health_server(&self) -> JoinHandle<()> {
        let addr = self.config.health_addr;
        info!("Starting health check server on {}", addr);

        tokio::spawn(async move {
            if let Err(e) = serve_health(addr).await {
                error!("Health server failed: {}", e);
            }
        })
    }

    async fn wait_for_shutdown(&mut self) -> std::io::Result<()> {
        let mut terminate = signal::unix::signal(SignalKind::terminate())?;

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = self.shutdown_rx.recv() => {
                info!("Received shutdown signal from internal component");
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Liveness and readiness routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ready", get(|| async { "OK" }))
}

async fn serve_health(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, health_routes()).await
}

/// Operator builder for fluent configuration
#[derive(Debug, Default)]
pub struct OperatorBuilder {
    config: OperatorConfig,
}

impl OperatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    pub fn field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.config.field_manager = field_manager.into();
        self
    }

    pub fn health_addr(mut self, addr: SocketAddr) -> Self {
        self.config.health_addr = addr;
        self
    }

    pub fn requeue_interval(mut self, interval: Duration) -> Self {
        self.config.requeue_interval = interval;
        self
    }

    pub fn error_requeue_interval(mut self, interval: Duration) -> Self {
        self.config.error_requeue_interval = interval;
        self
    }

    pub fn config(self) -> OperatorConfig {
        self.config
    }

    pub async fn build(self) -> anyhow::Result<OperatorManager> {
        OperatorManager::new(self.config).await
    }
}
