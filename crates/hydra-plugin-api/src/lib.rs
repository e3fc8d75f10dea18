//! # Hydra Plugin API
//!
//! This crate is the contract between the Hydra host and the native modules it
//! loads at runtime. Every loadable module links against it and exports exactly
//! one factory function.
//!
//! ## Module Tiers
//!
//! - **Plugin** (`createPlugin`): the root module, owner of the controller set
//! - **Controller** (`createController`): names the router module it uses
//! - **Router** (`createRouter`): names the directory its endpoints live in
//! - **Endpoint** (`createEndpoint`): declares one route and handles its requests
//!
//! ## Example
//!
//! ```rust,no_run
//! use hydra_plugin_api::prelude::*;
//!
//! #[derive(Debug)]
//! struct Hello;
//!
//! impl Endpoint for Hello {
//!     fn route_info(&self) -> RouteInfo {
//!         RouteInfo::new("/hello", "GET", "Get greeting")
//!     }
//!
//!     fn handle(&self, _body: &[u8]) -> Vec<u8> {
//!         b"Hello!".to_vec()
//!     }
//! }
//!
//! hydra_plugin_api::export_endpoint!(Hello);
//! ```
//!
//! Modules are loaded through the Rust ABI, so a module must be built with the
//! same toolchain as the host that loads it.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod abi;
pub mod capability;
pub mod route;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use abi::{
    CreateControllerFn, CreateEndpointFn, CreatePluginFn, CreateRouterFn,
    CREATE_CONTROLLER_SYMBOL, CREATE_ENDPOINT_SYMBOL, CREATE_PLUGIN_SYMBOL, CREATE_ROUTER_SYMBOL,
};
pub use capability::{
    ControllerDescriptor, Endpoint, PluginDescriptor, PluginMetadata, RouterDescriptor,
};
pub use route::{RouteInfo, RouteKey};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::capability::{
        ControllerDescriptor, Endpoint, PluginDescriptor, PluginMetadata, RouterDescriptor,
    };
    pub use crate::route::{RouteInfo, RouteKey};
}
