//! Host-side controller

use crate::error::LoadError;
use crate::layout::ModuleLayout;
use crate::loader::{LoadedController, ModuleLoader};
use crate::router::Router;
use hydra_plugin_api::{ControllerDescriptor, RouteInfo};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// A loaded controller module and its lazily loaded router
///
/// The router is loaded on the first call to [`Controller::router`]. The
/// outcome is cached either way: a router that failed to load stays absent
/// until the controller module itself is reloaded.
#[derive(Debug)]
pub struct Controller {
    descriptor: LoadedController,
    router_path: PathBuf,
    router: OnceCell<Option<Arc<Router>>>,
    loader: ModuleLoader,
    layout: Arc<ModuleLayout>,
}

impl Controller {
    /// Load the controller module at `path`
    pub fn load(
        loader: &ModuleLoader,
        path: &Path,
        layout: Arc<ModuleLayout>,
    ) -> Result<Self, LoadError> {
        let descriptor = loader.load::<dyn ControllerDescriptor>(path)?;
        let router_path = layout.router_path(descriptor.router());

        info!(
            controller = %descriptor.name(),
            router = %router_path.display(),
            "Controller loaded"
        );

        Ok(Self {
            descriptor,
            router_path,
            router: OnceCell::new(),
            loader: loader.clone(),
            layout,
        })
    }

    /// Controller name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Module file the controller was loaded from
    pub fn source(&self) -> &Path {
        self.descriptor.path()
    }

    /// Companion router module file
    pub fn router_path(&self) -> &Path {
        &self.router_path
    }

    /// The controller's router, loading it on first use
    pub fn router(&self) -> Option<Arc<Router>> {
        self.router
            .get_or_init(|| {
                match Router::load(&self.loader, &self.router_path, &self.layout) {
                    Ok(router) => Some(Arc::new(router)),
                    Err(e) => {
                        warn!(
                            controller = %self.name(),
                            error = %e,
                            "Failed to load router, controller disabled until reloaded"
                        );
                        None
                    }
                }
            })
            .clone()
    }

    /// The router if it has already been loaded
    pub fn loaded_router(&self) -> Option<&Arc<Router>> {
        self.router.get().and_then(Option::as_ref)
    }

    /// Routes served through this controller, loading the router if needed
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router().map(|router| router.routes()).unwrap_or_default()
    }
}
