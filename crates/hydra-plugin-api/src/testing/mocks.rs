//! Mock implementations for testing

use crate::capability::{ControllerDescriptor, Endpoint, PluginDescriptor, RouterDescriptor};
use crate::route::RouteInfo;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Endpoint that always answers with the same body
#[derive(Debug, Clone)]
pub struct StaticEndpoint {
    info: RouteInfo,
    body: Vec<u8>,
    calls: Arc<AtomicUsize>,
}

impl StaticEndpoint {
    /// Create a new static endpoint
    pub fn new(path: &str, method: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            info: RouteInfo::new(path, method, ""),
            body: body.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the route description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    /// Get number of handle calls, across all clones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Endpoint for StaticEndpoint {
    fn route_info(&self) -> RouteInfo {
        self.info.clone()
    }

    fn handle(&self, _body: &[u8]) -> Vec<u8> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.body.clone()
    }
}

type Handler = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// Endpoint backed by a closure
#[derive(Clone)]
pub struct FnEndpoint {
    info: RouteInfo,
    handler: Handler,
}

impl FnEndpoint {
    /// Create a new closure-backed endpoint
    pub fn new<F>(path: &str, method: &str, handler: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        Self {
            info: RouteInfo::new(path, method, ""),
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for FnEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint")
            .field("info", &self.info)
            .finish()
    }
}

impl Endpoint for FnEndpoint {
    fn route_info(&self) -> RouteInfo {
        self.info.clone()
    }

    fn handle(&self, body: &[u8]) -> Vec<u8> {
        (self.handler)(body)
    }
}

/// Router descriptor with a fixed name and endpoint directory
#[derive(Debug, Clone)]
pub struct StaticRouter {
    name: String,
    endpoint_dir: Option<String>,
}

impl StaticRouter {
    /// Router that uses the default endpoint directory
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_dir: None,
        }
    }

    /// Override the endpoint directory
    pub fn with_endpoint_dir(mut self, dir: impl Into<String>) -> Self {
        self.endpoint_dir = Some(dir.into());
        self
    }
}

impl RouterDescriptor for StaticRouter {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint_dir(&self) -> Option<&str> {
        self.endpoint_dir.as_deref()
    }
}

/// Controller descriptor pointing at a fixed router module
#[derive(Debug, Clone)]
pub struct StaticController {
    name: String,
    router: String,
}

impl StaticController {
    /// Create a new static controller
    pub fn new(name: impl Into<String>, router: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            router: router.into(),
        }
    }
}

impl ControllerDescriptor for StaticController {
    fn name(&self) -> &str {
        &self.name
    }

    fn router(&self) -> &str {
        &self.router
    }
}

/// Root plugin descriptor
#[derive(Debug, Clone)]
pub struct StaticPlugin {
    name: String,
    version: String,
}

impl StaticPlugin {
    /// Create a new static plugin
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl PluginDescriptor for StaticPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_endpoint_counts_calls() {
        let endpoint = StaticEndpoint::new("/hello", "GET", "hi");
        let observer = endpoint.clone();

        assert_eq!(endpoint.handle(b""), b"hi".to_vec());
        assert_eq!(endpoint.handle(b"ignored"), b"hi".to_vec());
        assert_eq!(observer.call_count(), 2);
    }

    #[test]
    fn test_fn_endpoint_sees_body() {
        let endpoint = FnEndpoint::new("/echo", "POST", |body| {
            let mut out = b"Echo: ".to_vec();
            out.extend_from_slice(body);
            out
        });

        assert_eq!(endpoint.handle(b"ping"), b"Echo: ping".to_vec());
        assert_eq!(endpoint.route_info().key().to_string(), "POST /echo");
    }
}
