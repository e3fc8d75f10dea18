//! Capability traits implemented by loadable modules

use crate::route::RouteInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request handler exported by an endpoint module
///
/// One endpoint serves exactly one `(path, method)` pair.
pub trait Endpoint: Send + Sync + fmt::Debug {
    /// Route this endpoint serves
    fn route_info(&self) -> RouteInfo;

    /// Handle a request body and produce the response body
    fn handle(&self, body: &[u8]) -> Vec<u8>;
}

/// Router module descriptor
///
/// The host owns the endpoint registry and the directory watcher; the module
/// only says where its endpoints live.
pub trait RouterDescriptor: Send + Sync + fmt::Debug {
    /// Router name, used in logs and introspection
    fn name(&self) -> &str;

    /// Endpoint directory, relative to the module root
    ///
    /// `None` selects the configured default (`endpoints/`).
    fn endpoint_dir(&self) -> Option<&str> {
        None
    }
}

/// Controller module descriptor
pub trait ControllerDescriptor: Send + Sync + fmt::Debug {
    /// Controller name, used in logs and introspection
    fn name(&self) -> &str;

    /// Library name of the companion router module in `routers/`
    ///
    /// This is the bare name (`web_router`); the host maps it to the platform
    /// file name (`libweb_router.so`, `web_router.dll`, ...).
    fn router(&self) -> &str;
}

/// Root plugin module descriptor
pub trait PluginDescriptor: Send + Sync + fmt::Debug {
    /// Plugin name
    fn name(&self) -> &str;

    /// Plugin version
    fn version(&self) -> &str;

    /// Plugin description
    fn description(&self) -> &str {
        ""
    }

    /// Get plugin metadata
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Plugin metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Plugin description
    pub description: String,
}
