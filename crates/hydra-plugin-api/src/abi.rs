//! Factory symbols and export macros
//!
//! Each module exports exactly one factory under a well-known name. The host
//! resolves it by name, calls it once, and keeps the module image mapped for as
//! long as the returned object lives.

use crate::capability::{ControllerDescriptor, Endpoint, PluginDescriptor, RouterDescriptor};

/// Factory symbol exported by root plugin modules
pub const CREATE_PLUGIN_SYMBOL: &str = "createPlugin";

/// Factory symbol exported by controller modules
pub const CREATE_CONTROLLER_SYMBOL: &str = "createController";

/// Factory symbol exported by router modules
pub const CREATE_ROUTER_SYMBOL: &str = "createRouter";

/// Factory symbol exported by endpoint modules
pub const CREATE_ENDPOINT_SYMBOL: &str = "createEndpoint";

/// Signature of `createPlugin`
pub type CreatePluginFn = fn() -> Box<dyn PluginDescriptor>;

/// Signature of `createController`
pub type CreateControllerFn = fn() -> Box<dyn ControllerDescriptor>;

/// Signature of `createRouter`
pub type CreateRouterFn = fn() -> Box<dyn RouterDescriptor>;

/// Signature of `createEndpoint`
pub type CreateEndpointFn = fn() -> Box<dyn Endpoint>;

/// Export an [`Endpoint`] as this module's `createEndpoint` factory
#[macro_export]
macro_rules! export_endpoint {
    ($ctor:expr) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub fn createEndpoint() -> ::std::boxed::Box<dyn $crate::Endpoint> {
            ::std::boxed::Box::new($ctor)
        }

        const _: $crate::CreateEndpointFn = createEndpoint;
    };
}

/// Export a [`RouterDescriptor`] as this module's `createRouter` factory
#[macro_export]
macro_rules! export_router {
    ($ctor:expr) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub fn createRouter() -> ::std::boxed::Box<dyn $crate::RouterDescriptor> {
            ::std::boxed::Box::new($ctor)
        }

        const _: $crate::CreateRouterFn = createRouter;
    };
}

/// Export a [`ControllerDescriptor`] as this module's `createController` factory
#[macro_export]
macro_rules! export_controller {
    ($ctor:expr) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub fn createController() -> ::std::boxed::Box<dyn $crate::ControllerDescriptor> {
            ::std::boxed::Box::new($ctor)
        }

        const _: $crate::CreateControllerFn = createController;
    };
}

/// Export a [`PluginDescriptor`] as this module's `createPlugin` factory
#[macro_export]
macro_rules! export_plugin {
    ($ctor:expr) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub fn createPlugin() -> ::std::boxed::Box<dyn $crate::PluginDescriptor> {
            ::std::boxed::Box::new($ctor)
        }

        const _: $crate::CreatePluginFn = createPlugin;
    };
}
