//! `GET /new` endpoint module
//!
//! Drop the built library into a running host's endpoint directory to add
//! the route without a restart.

use hydra_plugin_api::prelude::*;

/// Confirms the route was picked up while running
#[derive(Debug, Default)]
pub struct NewEndpoint;

impl Endpoint for NewEndpoint {
    fn route_info(&self) -> RouteInfo {
        RouteInfo::new("/new", "GET", "New hot-reloaded endpoint!")
    }

    fn handle(&self, _body: &[u8]) -> Vec<u8> {
        "🆕 This endpoint was added via hot reload!".as_bytes().to_vec()
    }
}

hydra_plugin_api::export_endpoint!(NewEndpoint);
