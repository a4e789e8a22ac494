//! kfseq server lifecycle
//!
//! Owns the artifact store, the export service and the background sweep
//! loop, and serves the HTTP application until a shutdown signal arrives.

use crate::api::build_app;
use crate::artifact::ArtifactStore;
use crate::config::KfseqConfig;
use crate::error::{Error, Result};
use crate::export::{publisher_from_config, ExportService, ExportState, Publisher};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not started
    Stopped,
    /// Running
    Running,
    /// Stopped after running; the store has been shut down
    Finished,
}

/// kfseq HTTP server
pub struct Server {
    config: KfseqConfig,
    state: RwLock<ServerState>,
    store: Arc<ArtifactStore>,
    service: Arc<ExportService>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    started: Instant,
}

impl Server {
    /// Create a server, preparing artifact storage
    pub async fn new(config: KfseqConfig, publisher: Arc<dyn Publisher>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(ArtifactStore::from_config(&config).await?);
        let service = Arc::new(ExportService::new(store.clone(), publisher, &config));

        Ok(Self {
            config,
            state: RwLock::new(ServerState::Stopped),
            store,
            service,
            sweeper: Mutex::new(None),
            started: Instant::now(),
        })
    }

    pub fn config(&self) -> &KfseqConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn service(&self) -> &Arc<ExportService> {
        &self.service
    }

    /// Get current state
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Start background work. A server cannot be restarted once stopped.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.write().await;
        match *state {
            ServerState::Stopped => {}
            ServerState::Running => return Err(Error::Config("Server already running".to_string())),
            ServerState::Finished => {
                return Err(Error::Config("Server cannot be restarted after stop".to_string()))
            }
        }

        if self.config.retention.auto_sweep {
            let handle = self.store.spawn_sweeper(self.config.retention.sweep_interval());
            *self.sweeper.lock().await = Some(handle);
            tracing::info!(
                interval_secs = self.config.retention.sweep_interval_secs,
                retention_secs = self.config.retention.retention_secs,
                "Artifact sweeper started"
            );
        }

        *state = ServerState::Running;
        Ok(())
    }

    /// Stop background work and cancel pending deferred deletes
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != ServerState::Running {
            return Ok(());
        }

        tracing::info!("Stopping kfseq server");
        self.store.shutdown();
        if let Some(handle) = self.sweeper.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Artifact sweeper ended abnormally: {}", e);
            }
        }

        *state = ServerState::Finished;
        Ok(())
    }

    /// HTTP application for this server
    pub fn router(&self) -> Router {
        build_app(
            ExportState {
                service: self.service.clone(),
            },
            self.started,
            &self.config.server,
        )
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn serve<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        self.start().await?;
        tracing::info!(
            "kfseq listening on {} (publisher: {})",
            addr,
            self.service.publisher_name()
        );

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        self.stop().await?;
        result.map_err(Error::Io)
    }
}

/// Builder for Server
pub struct ServerBuilder {
    config: KfseqConfig,
    publisher: Option<Arc<dyn Publisher>>,
}

impl ServerBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: KfseqConfig::default(),
            publisher: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: KfseqConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Use a specific publisher instead of the configured one
    pub fn publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Build the server
    pub async fn build(self) -> Result<Server> {
        let publisher = match self.publisher {
            Some(publisher) => publisher,
            None => publisher_from_config(&self.config.publish)?,
        };
        Server::new(self.config, publisher).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackendKind;
    use crate::sequence::types::fixtures::keyframe;
    use crate::sequence::Easing;
    use bytes::Bytes;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_server_creation() {
        let server = ServerBuilder::new()
            .host("127.0.0.1")
            .port(18790)
            .build()
            .await
            .unwrap();

        assert_eq!(server.state().await, ServerState::Stopped);
        assert_eq!(server.config().server.port, 18790);
        assert_eq!(server.service().publisher_name(), "unconfigured");
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = ServerBuilder::new().build().await.unwrap();

        server.start().await.unwrap();
        assert_eq!(server.state().await, ServerState::Running);
        assert!(server.start().await.is_err());

        server.stop().await.unwrap();
        assert_eq!(server.state().await, ServerState::Finished);
        assert!(server.store().is_shut_down());

        // Stopping twice is a no-op; restarting is refused
        server.stop().await.unwrap();
        assert!(server.start().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = KfseqConfig::default();
        config.retention.retention_secs = 0;
        let result = ServerBuilder::new().config(config).build().await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_while_started() {
        let mut config = KfseqConfig::default();
        config.retention.retention_secs = 10;
        config.retention.sweep_interval_secs = 5;
        let server = ServerBuilder::new().config(config).build().await.unwrap();

        let id = server
            .store()
            .put(
                "Idle",
                None,
                vec![keyframe(0.0, "Torso", Easing::Linear)],
                Bytes::from_static(b"<roblox/>"),
            )
            .await
            .unwrap();

        server.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(!server.store().contains(&id).await);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_disk_storage_cleans_orphans_on_build() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stale_1.rbxm"), "old").unwrap();

        let mut config = KfseqConfig::default();
        config.storage.backend = StorageBackendKind::Disk;
        config.storage.base_dir = dir.path().to_path_buf();
        let _server = ServerBuilder::new().config(config).build().await.unwrap();

        assert!(!dir.path().join("stale_1.rbxm").exists());
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let server = Arc::new(
            ServerBuilder::new()
                .host("127.0.0.1")
                .port(0)
                .build()
                .await
                .unwrap(),
        );

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .serve(async {
                        let _ = rx.await;
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.state().await, ServerState::Running);

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(server.state().await, ServerState::Finished);
    }
}
