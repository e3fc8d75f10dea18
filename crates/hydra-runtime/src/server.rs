//! HTTP server implementation

use crate::handler::{text_response, RequestHandler};
use crate::shutdown::ShutdownSignal;
use crate::RuntimeState;
use bytes::Bytes;
use hydra_config::Config;
use hydra_core::{Error, Result};
use hydra_plugin_runtime::{
    ModuleLoader, NativeOpener, PluginManager, ReloadScheduler, SHADOW_CLEANUP_GRACE,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// HTTP server in front of a [`PluginManager`]
#[derive(Debug)]
pub struct Server {
    config: Config,
    manager: Arc<PluginManager>,
    handler: RequestHandler,
    state: Arc<RwLock<RuntimeState>>,
    shutdown: ShutdownSignal,
    in_flight: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server builder
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Get the current state
    pub async fn state(&self) -> RuntimeState {
        *self.state.read().await
    }

    /// Get listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.config.server.listen
    }

    /// Get the plugin manager
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// Requests currently being handled
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.listen_addr()).await.map_err(|e| {
            Error::Runtime(format!("Failed to bind to {}: {}", self.listen_addr(), e))
        })?;

        self.serve(listener).await
    }

    /// Serve connections from `listener` until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.set_state(RuntimeState::Running).await;

        let local_addr = listener.local_addr()?;
        tracing::info!(
            listen = %local_addr,
            admin = self.config.server.admin,
            "Server listening"
        );

        let scheduler = if self.config.reload.enabled {
            Some(ReloadScheduler::spawn(
                Arc::clone(&self.manager),
                self.config.reload.poll_interval,
            ))
        } else {
            tracing::info!("Hot reload disabled");
            None
        };

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::trace!("Accepted connection from {}", addr);

                            let handler = self.handler.clone();
                            tokio::spawn(async move {
                                let service = hyper::service::service_fn(move |req| {
                                    let handler = handler.clone();
                                    async move {
                                        match handler.handle(req).await {
                                            Ok(response) => Ok(response),
                                            Err(e) => {
                                                tracing::error!("Request handler error: {}", e);
                                                text_response(
                                                    e.to_status_code(),
                                                    Bytes::from(format!("Error: {e}")),
                                                )
                                            }
                                        }
                                    }
                                });

                                let io = hyper_util::rt::TokioIo::new(stream);
                                if let Err(e) = hyper::server::conn::http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    tracing::error!("HTTP connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.set_state(RuntimeState::ShuttingDown).await;
        tracing::info!("Server shutting down gracefully");

        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }

        let shutdown_timeout = self.config.server.shutdown_timeout;
        let start = Instant::now();

        tracing::info!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Waiting for in-flight requests to complete"
        );

        loop {
            let active = self.in_flight();

            if active == 0 {
                tracing::info!("All requests completed, shutting down cleanly");
                break;
            }

            if start.elapsed() >= shutdown_timeout {
                tracing::warn!(
                    active_requests = active,
                    "Shutdown timeout reached, forcing shutdown"
                );
                break;
            }

            tracing::debug!(
                active_requests = active,
                elapsed_ms = start.elapsed().as_millis(),
                "Waiting for active requests to complete"
            );

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        self.set_state(RuntimeState::Stopped).await;

        tracing::info!(
            shutdown_duration_ms = start.elapsed().as_millis(),
            "Server stopped"
        );

        Ok(())
    }

    async fn set_state(&self, next: RuntimeState) {
        *self.state.write().await = next;
    }
}

/// Server builder
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    manager: Option<Arc<PluginManager>>,
    shutdown: Option<ShutdownSignal>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Serve an existing manager instead of creating one from the configuration
    pub fn manager(mut self, manager: Arc<PluginManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Share a shutdown signal with the caller
    pub fn shutdown_signal(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build the server
    ///
    /// The manager is created but not loaded; callers decide whether a missing
    /// root plugin is fatal.
    pub fn build(self) -> Result<Server> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("config is required".to_string()))?;

        let manager = match self.manager {
            Some(manager) => manager,
            None => {
                let opener = match &config.modules.shadow_dir {
                    Some(dir) => NativeOpener::with_shadow_dir(dir),
                    None => NativeOpener::new(),
                };
                opener.cleanup_stale_shadows(SHADOW_CLEANUP_GRACE);
                Arc::new(PluginManager::new(
                    ModuleLoader::new(Arc::new(opener)),
                    config.to_layout(),
                ))
            }
        };

        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut handler = RequestHandler::new(Arc::clone(&manager), config.server.max_body_size)
            .with_timeout(config.server.request_timeout);
        if config.server.admin {
            handler = handler.with_admin();
        }
        let handler = handler.with_in_flight(Arc::clone(&in_flight));

        Ok(Server {
            config,
            manager,
            handler,
            state: Arc::new(RwLock::new(RuntimeState::Initializing)),
            shutdown: self.shutdown.unwrap_or_default(),
            in_flight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_config() {
        let err = ServerBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_builder_creates_idle_manager() {
        let server = Server::builder().config(Config::default()).build().unwrap();

        assert_eq!(server.state().await, RuntimeState::Initializing);
        assert_eq!(server.manager().generation(), 0);
        assert_eq!(server.in_flight(), 0);
        assert_eq!(server.listen_addr(), Config::default().server.listen);
    }
}
