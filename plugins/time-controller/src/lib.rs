//! `time_controller` controller module

use hydra_plugin_api::prelude::*;

/// Routes requests through `api_router`
#[derive(Debug, Default)]
pub struct TimeController;

impl ControllerDescriptor for TimeController {
    fn name(&self) -> &str {
        "time_controller"
    }

    fn router(&self) -> &str {
        "api_router"
    }
}

hydra_plugin_api::export_controller!(TimeController);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        let controller = createController();
        assert_eq!(controller.name(), "time_controller");
        assert_eq!(controller.router(), "api_router");
    }
}
