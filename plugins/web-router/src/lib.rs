//! `web_router` router module
//!
//! Shares the default endpoint directory with `api_router`; when both
//! controllers are loaded, the first controller in file order answers.

use hydra_plugin_api::prelude::*;

#[derive(Debug, Default)]
pub struct WebRouter;

impl RouterDescriptor for WebRouter {
    fn name(&self) -> &str {
        "web_router"
    }
}

hydra_plugin_api::export_router!(WebRouter);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        let router = createRouter();
        assert_eq!(router.name(), "web_router");
        assert_eq!(router.endpoint_dir(), None);
    }
}
