//! Admin introspection routes

use crate::handler::Body;
use bytes::Bytes;
use http::{header, Method, Response, StatusCode};
use http_body_util::Full;
use hydra_core::{Error, Result};
use hydra_plugin_runtime::{PluginManager, SlotState};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Path prefix of the admin routes
pub const ADMIN_PREFIX: &str = "/__admin/";

/// Admin handler
#[derive(Clone, Debug)]
pub struct AdminHandler {
    manager: Arc<PluginManager>,
    in_flight: Arc<AtomicUsize>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    state: SlotState,
    generation: u64,
    in_flight: usize,
}

#[derive(Debug, Serialize)]
struct Reloaded {
    generation: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AdminHandler {
    /// Create a new admin handler
    pub fn new(manager: Arc<PluginManager>, in_flight: Arc<AtomicUsize>) -> Self {
        Self { manager, in_flight }
    }

    /// Handle an admin route; `path` is relative to [`ADMIN_PREFIX`]
    pub async fn handle(&self, method: &Method, path: &str) -> Result<Response<Body>> {
        debug!(method = %method, path = %path, "Handling admin route");

        match (method, path) {
            (&Method::GET, "routes") => {
                json(StatusCode::OK, &self.blocking(PluginManager::list_routes).await?)
            }
            (&Method::GET, "stats") => {
                json(StatusCode::OK, &self.blocking(PluginManager::stats).await?)
            }
            (&Method::GET, "reloads") => json(StatusCode::OK, &self.manager.reload_history()),
            (&Method::GET, "health") => self.health(),
            (&Method::POST, "reload") => self.reload().await,
            _ => json(
                StatusCode::NOT_FOUND,
                &ErrorBody {
                    error: format!("No admin route {method} {ADMIN_PREFIX}{path}"),
                },
            ),
        }
    }

    /// Run `f` off the async workers; listing routes may load router images
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PluginManager) -> T + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || f(&*manager))
            .await
            .map_err(|e| Error::Internal(format!("Admin task failed: {e}")))
    }

    fn health(&self) -> Result<Response<Body>> {
        let state = self.manager.state();
        let (status, code) = match state {
            SlotState::Active => ("ok", StatusCode::OK),
            SlotState::Loading | SlotState::Empty => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
        };

        json(
            code,
            &Health {
                status,
                state,
                generation: self.manager.generation(),
                in_flight: self.in_flight.load(Ordering::Relaxed),
            },
        )
    }

    async fn reload(&self) -> Result<Response<Body>> {
        let manager = Arc::clone(&self.manager);
        let result = tokio::task::spawn_blocking(move || manager.reload())
            .await
            .map_err(|e| Error::Internal(format!("Reload task failed: {e}")))?;

        match result {
            Ok(generation) => json(StatusCode::OK, &Reloaded { generation }),
            Err(e) => json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorBody {
                    error: e.to_string(),
                },
            ),
        }
    }
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>> {
    let body = serde_json::to_vec(value)?;

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| Error::Internal(format!("Failed to build response: {e}")))
}
