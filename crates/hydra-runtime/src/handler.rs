//! HTTP request handler

use crate::admin::{AdminHandler, ADMIN_PREFIX};
use bytes::Bytes;
use http::{header, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hydra_core::{Error, Result};
use hydra_plugin_runtime::PluginManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Body type alias
pub type Body = Full<Bytes>;

/// Translates HTTP requests into plugin dispatches
#[derive(Clone, Debug)]
pub struct RequestHandler {
    manager: Arc<PluginManager>,
    admin: Option<AdminHandler>,
    max_body_size: usize,
    request_timeout: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(manager: Arc<PluginManager>, max_body_size: usize) -> Self {
        Self {
            manager,
            admin: None,
            max_body_size,
            request_timeout: Duration::from_secs(30),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve the admin routes under `/__admin/`
    pub fn with_admin(mut self) -> Self {
        self.admin = Some(AdminHandler::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.in_flight),
        ));
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Share an in-flight counter with the server
    pub fn with_in_flight(mut self, in_flight: Arc<AtomicUsize>) -> Self {
        self.in_flight = in_flight;
        if self.admin.is_some() {
            self = self.with_admin();
        }
        self
    }

    /// Requests currently being handled
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Handle one HTTP request
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Body>>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let _guard = InFlight::enter(&self.in_flight);
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        debug!(method = %method, path = %path, "Handling request");

        if let Some(admin) = &self.admin {
            if let Some(rest) = path.strip_prefix(ADMIN_PREFIX) {
                return admin.handle(&method, rest).await;
            }
        }

        let body = match Limited::new(req.into_body(), self.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(Error::PayloadTooLarge {
                    limit: self.max_body_size,
                });
            }
            Err(e) => {
                return Err(Error::InvalidRequest(format!(
                    "Failed to read request body: {e}"
                )));
            }
        };

        // Endpoint code is synchronous and may block.
        let manager = Arc::clone(&self.manager);
        let method_str = method.to_string();
        let dispatch_path = path.clone();
        let dispatch = tokio::task::spawn_blocking(move || {
            manager.dispatch(&dispatch_path, &method_str, &body)
        });

        let response = match tokio::time::timeout(self.request_timeout, dispatch).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(Error::Internal(format!("Endpoint panicked: {e}")));
            }
            Err(_) => {
                warn!(method = %method, path = %path, "Request timed out");
                return text_response(StatusCode::GATEWAY_TIMEOUT, Bytes::from("Request timed out"));
            }
        };

        debug!(
            method = %method,
            path = %path,
            status = %response.status,
            duration_ms = start.elapsed().as_millis(),
            "Request completed"
        );

        text_response(response.status.to_status_code(), response.body)
    }
}

/// Build a `text/plain` response
pub(crate) fn text_response(status: StatusCode, body: Bytes) -> Result<Response<Body>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(body))
        .map_err(|e| Error::Internal(format!("Failed to build response: {e}")))
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
