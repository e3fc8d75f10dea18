//! `api_router` router module

use hydra_plugin_api::prelude::*;

/// Serves the shared `endpoints/` directory
#[derive(Debug, Default)]
pub struct ApiRouter;

impl RouterDescriptor for ApiRouter {
    fn name(&self) -> &str {
        "api_router"
    }
}

hydra_plugin_api::export_router!(ApiRouter);
