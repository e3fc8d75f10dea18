//! Host-side router

use crate::error::LoadError;
use crate::layout::ModuleLayout;
use crate::loader::{LoadedEndpoint, LoadedRouter, ModuleLoader};
use crate::registry::{EndpointRegistry, RegistryUpdate};
use crate::watch::DirectoryWatcher;
use hydra_plugin_api::{RouteInfo, RouterDescriptor};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A loaded router module with its endpoint registry
///
/// [`Router::resolve`] only reads the published registry. The endpoint
/// directory is rescanned by [`Router::refresh`], which the reload scheduler
/// calls once per tick.
#[derive(Debug)]
pub struct Router {
    descriptor: LoadedRouter,
    endpoint_dir: PathBuf,
    registry: EndpointRegistry,
    watcher: Mutex<DirectoryWatcher>,
    loader: ModuleLoader,
}

impl Router {
    /// Load the router module at `path` and register its current endpoints
    pub fn load(
        loader: &ModuleLoader,
        path: &Path,
        layout: &ModuleLayout,
    ) -> Result<Self, LoadError> {
        let descriptor = loader.load::<dyn RouterDescriptor>(path)?;
        let endpoint_dir = layout.endpoints_dir(descriptor.endpoint_dir());
        let watcher = DirectoryWatcher::new(&endpoint_dir, layout.extensions.iter().cloned())
            .with_settle(layout.settle);

        let router = Self {
            descriptor,
            endpoint_dir,
            registry: EndpointRegistry::new(),
            watcher: Mutex::new(watcher),
            loader: loader.clone(),
        };
        let update = router.refresh();

        info!(
            router = %router.name(),
            endpoint_dir = %router.endpoint_dir.display(),
            endpoints = update.loaded,
            "Router loaded"
        );
        Ok(router)
    }

    /// Router name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Module file the router was loaded from
    pub fn source(&self) -> &Path {
        self.descriptor.path()
    }

    /// Directory endpoints are loaded from
    pub fn endpoint_dir(&self) -> &Path {
        &self.endpoint_dir
    }

    /// Endpoint registry
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Endpoint serving `(path, method)`, if any
    pub fn resolve(&self, path: &str, method: &str) -> Option<Arc<LoadedEndpoint>> {
        self.registry.resolve(path, method)
    }

    /// Copy of the current route metadata
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.registry.routes()
    }

    /// Poll the endpoint directory and apply what changed
    pub fn refresh(&self) -> RegistryUpdate {
        let mut watcher = self.watcher.lock();
        let changes = watcher.poll();
        self.registry.apply(&self.loader, &changes)
    }
}
