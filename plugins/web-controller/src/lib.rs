//! `web_controller` controller module

use hydra_plugin_api::prelude::*;

/// Routes requests through `web_router`
#[derive(Debug, Default)]
pub struct WebController;

impl ControllerDescriptor for WebController {
    fn name(&self) -> &str {
        "web_controller"
    }

    fn router(&self) -> &str {
        "web_router"
    }
}

hydra_plugin_api::export_controller!(WebController);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        let controller = createController();
        assert_eq!(controller.name(), "web_controller");
        assert_eq!(controller.router(), "web_router");
    }
}
