//! Endpoint registry
//!
//! The registry is an immutable [`EndpointTable`] behind an `ArcSwap`.
//! Lookups load the current table without locking; [`EndpointRegistry::apply`]
//! builds a successor table from a batch of directory changes and publishes it
//! with a single store. Endpoints are shared as `Arc`s, so a request holding
//! an endpoint from an older table keeps its module mapped until it returns.

use crate::loader::{LoadedEndpoint, ModuleLoader};
use crate::watch::DirectoryChanges;
use arc_swap::ArcSwap;
use hydra_plugin_api::{Endpoint, RouteInfo, RouteKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registered endpoint and the file it was loaded from
#[derive(Debug, Clone)]
pub struct RegisteredEndpoint {
    /// Route metadata, read once at load time
    pub info: RouteInfo,
    /// Module file the endpoint came from
    pub source: PathBuf,
    /// The loaded endpoint
    pub endpoint: Arc<LoadedEndpoint>,
}

/// One immutable generation of the registry
///
/// Every loaded module file has exactly one registration. A registration is
/// either active, serving its route, or shadowed by a later registration of
/// the same `(path, method)`. Shadowed registrations stay loaded so the route
/// can fall back to them when the file that took it over goes away.
#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    entries: Vec<RegisteredEndpoint>,
    index: HashMap<RouteKey, usize>,
    shadowed: Vec<RegisteredEndpoint>,
}

impl EndpointTable {
    /// Look up the endpoint serving `(path, method)`
    pub fn get(&self, path: &str, method: &str) -> Option<&RegisteredEndpoint> {
        self.index
            .get(&RouteKey::new(path, method))
            .map(|&i| &self.entries[i])
    }

    /// Active entries in insertion order
    pub fn entries(&self) -> &[RegisteredEndpoint] {
        &self.entries
    }

    /// Registrations overridden by a later one for the same route, oldest first
    pub fn shadowed(&self) -> &[RegisteredEndpoint] {
        &self.shadowed
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no route is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &RouteKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.info.key(), i))
            .collect();
    }

    /// Drop the registration loaded from `source`
    ///
    /// An active route falls back to the most recent shadowed registration
    /// for the same key, if any.
    fn remove_source(&mut self, source: &Path) -> bool {
        if let Some(i) = self.shadowed.iter().position(|e| e.source == source) {
            self.shadowed.remove(i);
            return true;
        }

        let Some(i) = self.entries.iter().position(|e| e.source == source) else {
            return false;
        };
        let key = self.entries[i].info.key();
        match self.shadowed.iter().rposition(|e| e.info.key() == key) {
            Some(j) => {
                let fallback = self.shadowed.remove(j);
                info!(
                    route = %key,
                    source = %fallback.source.display(),
                    "Route falls back to earlier registration"
                );
                self.entries[i] = fallback;
            }
            None => {
                debug!(route = %key, source = %source.display(), "Route released");
                self.entries.remove(i);
                self.reindex();
            }
        }
        true
    }

    fn insert(&mut self, entry: RegisteredEndpoint) {
        let key = entry.info.key();
        if let Some(i) = self.position(&key) {
            if self.entries[i].source == entry.source {
                self.entries[i] = entry;
                return;
            }
        }

        // The file may have served another route before this load.
        self.remove_source(&entry.source);

        match self.position(&key) {
            Some(i) => {
                warn!(
                    route = %key,
                    previous = %self.entries[i].source.display(),
                    source = %entry.source.display(),
                    "Route registered twice, keeping the latest"
                );
                let previous = std::mem::replace(&mut self.entries[i], entry);
                self.shadowed.push(previous);
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// Outcome of applying one batch of directory changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryUpdate {
    /// Modules loaded and registered
    pub loaded: usize,
    /// Modules that failed to load
    pub failed: usize,
    /// Registrations dropped because their file disappeared
    pub removed: usize,
}

impl RegistryUpdate {
    /// True when the published table changed
    pub fn changed(&self) -> bool {
        self.loaded > 0 || self.removed > 0
    }
}

/// Routes `(path, method)` pairs to loaded endpoints
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    table: ArcSwap<EndpointTable>,
    writer: Mutex<()>,
}

impl EndpointRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Current table
    pub fn table(&self) -> Arc<EndpointTable> {
        self.table.load_full()
    }

    /// Endpoint serving `(path, method)` in the current table
    pub fn resolve(&self, path: &str, method: &str) -> Option<Arc<LoadedEndpoint>> {
        self.table
            .load()
            .get(path, method)
            .map(|entry| Arc::clone(&entry.endpoint))
    }

    /// Route metadata in insertion order
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table
            .load()
            .entries()
            .iter()
            .map(|entry| entry.info.clone())
            .collect()
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    /// True when no route is registered
    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    /// Apply directory changes and publish the resulting table
    ///
    /// Removed files are processed first, then added and modified files in
    /// lexicographic order, so a key declared by several files is served by
    /// the last one loaded. When that file is removed, the route falls back
    /// to the most recent remaining registration instead of disappearing. A
    /// file that fails to load keeps whatever it registered before.
    pub fn apply(&self, loader: &ModuleLoader, changes: &DirectoryChanges) -> RegistryUpdate {
        let mut update = RegistryUpdate::default();
        if changes.is_empty() {
            return update;
        }

        let _writer = self.writer.lock();
        let mut next = EndpointTable::clone(&self.table.load());

        for path in &changes.removed {
            if next.remove_source(path) {
                info!(source = %path.display(), "Endpoint removed");
                update.removed += 1;
            }
        }

        for path in changes.loadable() {
            let endpoint = match loader.load::<dyn Endpoint>(path) {
                Ok(endpoint) => Arc::new(endpoint),
                Err(e) => {
                    warn!(error = %e, "Failed to load endpoint, keeping previous state");
                    update.failed += 1;
                    continue;
                }
            };

            let info = endpoint.route_info();
            info!(route = %info.key(), source = %path.display(), "Endpoint registered");
            next.insert(RegisteredEndpoint {
                info,
                source: path.clone(),
                endpoint,
            });
            update.loaded += 1;
        }

        if update.changed() {
            self.table.store(Arc::new(next));
        }
        update
    }
}
