//! Root plugin lifecycle
//!
//! [`PluginManager`] owns the root plugin module slot and publishes the
//! dispatch graph as immutable [`PluginSnapshot`]s. Readers take the current
//! snapshot with one atomic load and keep it for the whole request; the
//! reload path builds a successor and swaps it in, so a request never sees a
//! half-built graph and an old generation is freed once its last request is
//! done with it.

use crate::controller::Controller;
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::layout::ModuleLayout;
use crate::loader::{LoadedPlugin, ModuleLoader};
use crate::registry::RegistryUpdate;
use crate::watch::{DirectoryChanges, DirectoryWatcher, FileStatus, HotFile};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use hydra_core::{DispatchResponse, DispatchStatus};
use hydra_plugin_api::{PluginDescriptor, PluginMetadata, RouteInfo};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

/// Reload events kept for introspection
pub const RELOAD_HISTORY_LIMIT: usize = 64;

/// State of the root plugin slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No plugin has ever loaded
    Empty,
    /// A load is in progress
    Loading,
    /// A snapshot is published
    Active,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Loading => write!(f, "loading"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// One immutable generation of the dispatch graph
#[derive(Debug)]
pub struct PluginSnapshot {
    generation: u64,
    plugin: Arc<LoadedPlugin>,
    controllers: Vec<Arc<Controller>>,
    published_at: DateTime<Utc>,
}

impl PluginSnapshot {
    /// Generation number, increasing with every publish
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Root plugin of this generation
    pub fn plugin(&self) -> &LoadedPlugin {
        &self.plugin
    }

    /// Controllers in dispatch order
    pub fn controllers(&self) -> &[Arc<Controller>] {
        &self.controllers
    }

    /// When this generation was published
    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// What a reload event was about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadTarget {
    /// The root plugin module and everything under it
    Plugin,
    /// The controllers directory
    Controllers,
    /// An endpoint directory
    Endpoints,
}

/// Record of one reload attempt
#[derive(Debug, Clone, Serialize)]
pub struct ReloadEvent {
    /// What was reloaded
    pub target: ReloadTarget,
    /// Generation current after the attempt
    pub generation: u64,
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
    /// Whether anything failed to load
    pub success: bool,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one [`PluginManager::poll`] cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// The root plugin was reloaded and a new generation published
    pub plugin_reloaded: bool,
    /// The root plugin changed but failed to load
    pub plugin_failed: bool,
    /// Controllers loaded from the controllers directory
    pub controllers_loaded: usize,
    /// Controllers that failed to load
    pub controllers_failed: usize,
    /// Controllers dropped because their file disappeared
    pub controllers_removed: usize,
    /// Endpoint changes summed over all loaded routers
    pub endpoints: RegistryUpdate,
}

impl PollReport {
    /// True when a new snapshot was published
    pub fn published(&self) -> bool {
        self.plugin_reloaded || self.controllers_loaded > 0 || self.controllers_removed > 0
    }
}

/// Runtime statistics
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStats {
    /// Slot state
    pub state: SlotState,
    /// Current generation, 0 before the first publish
    pub generation: u64,
    /// Root plugin metadata
    pub plugin: Option<PluginMetadata>,
    /// Controllers in the current snapshot
    pub controllers: usize,
    /// Routers loaded so far in the current snapshot
    pub routers: usize,
    /// Routes served by loaded routers
    pub routes: usize,
    /// When the current snapshot was published
    pub published_at: Option<DateTime<Utc>>,
    /// Requests dispatched
    pub requests: u64,
    /// Requests that matched no route
    pub not_found: u64,
    /// Requests rejected because no plugin was loaded
    pub unavailable: u64,
    /// Successful reloads
    pub reloads: u64,
    /// Failed reloads
    pub failed_reloads: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    not_found: AtomicU64,
    unavailable: AtomicU64,
    reloads: AtomicU64,
    failed_reloads: AtomicU64,
}

#[derive(Debug, Default)]
struct ControllerUpdate {
    loaded: usize,
    failed: usize,
    removed: usize,
}

/// Root plugin manager
#[derive(Debug)]
pub struct PluginManager {
    loader: ModuleLoader,
    layout: Arc<ModuleLayout>,
    current: ArcSwapOption<PluginSnapshot>,
    state: Mutex<SlotState>,
    generation: AtomicU64,
    plugin_file: Mutex<HotFile>,
    controllers_dir: Mutex<DirectoryWatcher>,
    reload_lock: Mutex<()>,
    history: Mutex<VecDeque<ReloadEvent>>,
    counters: Counters,
}

impl PluginManager {
    /// Create a manager over `layout`; nothing is loaded until [`PluginManager::load`]
    pub fn new(loader: ModuleLoader, layout: ModuleLayout) -> Self {
        let plugin_file = HotFile::new(layout.plugin_path()).with_settle(layout.settle);
        let controllers_dir =
            DirectoryWatcher::new(layout.controllers_dir(), layout.extensions.iter().cloned())
                .with_settle(layout.settle);

        Self {
            loader,
            layout: Arc::new(layout),
            current: ArcSwapOption::empty(),
            state: Mutex::new(SlotState::Empty),
            generation: AtomicU64::new(0),
            plugin_file: Mutex::new(plugin_file),
            controllers_dir: Mutex::new(controllers_dir),
            reload_lock: Mutex::new(()),
            history: Mutex::new(VecDeque::with_capacity(RELOAD_HISTORY_LIMIT)),
            counters: Counters::default(),
        }
    }

    /// Module layout
    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    /// Load the root plugin and its controllers, then publish them
    ///
    /// On failure the previously published snapshot, if any, stays current.
    pub fn load(&self) -> Result<u64> {
        let _guard = self.reload_lock.lock();
        let result = self.reload_root();
        // The explicit load consumed whatever change the watcher would report.
        *self.plugin_file.lock() =
            HotFile::new(self.layout.plugin_path()).with_settle(self.layout.settle);
        result
    }

    /// Reload the root plugin; same as [`PluginManager::load`]
    pub fn reload(&self) -> Result<u64> {
        self.load()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Option<Arc<PluginSnapshot>> {
        self.current.load_full()
    }

    /// State of the root plugin slot
    pub fn state(&self) -> SlotState {
        *self.state.lock()
    }

    /// Generation of the current snapshot, 0 before the first publish
    pub fn generation(&self) -> u64 {
        self.current
            .load()
            .as_ref()
            .map_or(0, |snapshot| snapshot.generation)
    }

    /// Route a request through the current snapshot
    pub fn dispatch(&self, path: &str, method: &str, body: &[u8]) -> DispatchResponse {
        let snapshot = self.current.load_full();
        let response = dispatch(snapshot.as_deref(), path, method, body);

        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        match response.status {
            DispatchStatus::Ok => {}
            DispatchStatus::NotFound => {
                self.counters.not_found.fetch_add(1, Ordering::Relaxed);
            }
            DispatchStatus::Unavailable => {
                self.counters.unavailable.fetch_add(1, Ordering::Relaxed);
            }
        }
        response
    }

    /// Every route reachable through the current snapshot
    ///
    /// Routes are listed in dispatch order. A key served by several
    /// controllers is listed once, for the controller that wins dispatch.
    pub fn list_routes(&self) -> Vec<RouteInfo> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        snapshot
            .controllers()
            .iter()
            .flat_map(|controller| controller.routes())
            .filter(|route| seen.insert(route.key()))
            .collect()
    }

    /// Recent reload events, oldest first
    pub fn reload_history(&self) -> Vec<ReloadEvent> {
        self.history.lock().iter().cloned().collect()
    }

    /// Runtime statistics
    pub fn stats(&self) -> RuntimeStats {
        let snapshot = self.snapshot();
        let routers: Vec<_> = snapshot
            .iter()
            .flat_map(|s| s.controllers())
            .filter_map(|c| c.loaded_router())
            .collect();

        RuntimeStats {
            state: self.state(),
            generation: snapshot.as_ref().map_or(0, |s| s.generation),
            plugin: snapshot.as_ref().map(|s| s.plugin.metadata()),
            controllers: snapshot.as_ref().map_or(0, |s| s.controllers.len()),
            routers: routers.len(),
            routes: routers.iter().map(|r| r.registry().len()).sum(),
            published_at: snapshot.as_ref().map(|s| s.published_at),
            requests: self.counters.requests.load(Ordering::Relaxed),
            not_found: self.counters.not_found.load(Ordering::Relaxed),
            unavailable: self.counters.unavailable.load(Ordering::Relaxed),
            reloads: self.counters.reloads.load(Ordering::Relaxed),
            failed_reloads: self.counters.failed_reloads.load(Ordering::Relaxed),
        }
    }

    /// Run one reload cycle
    ///
    /// Checks the root plugin file first. If it changed, everything is
    /// reloaded from scratch. Otherwise the controllers directory and the
    /// endpoint directory of every loaded router are polled in turn.
    pub fn poll(&self) -> PollReport {
        let _guard = self.reload_lock.lock();
        let mut report = PollReport::default();

        let status = self.plugin_file.lock().poll();
        match status {
            FileStatus::Changed => {
                info!(path = %self.layout.plugin_path().display(), "Root plugin changed");
                match self.reload_root() {
                    Ok(_) => report.plugin_reloaded = true,
                    Err(_) => report.plugin_failed = true,
                }
                return report;
            }
            FileStatus::Missing => {
                trace!(path = %self.layout.plugin_path().display(), "Root plugin missing");
            }
            FileStatus::Unchanged => {}
        }

        if self.current.load().is_none() {
            return report;
        }

        let changes = self.controllers_dir.lock().poll();
        if !changes.is_empty() {
            let update = self.update_controllers(&changes);
            report.controllers_loaded = update.loaded;
            report.controllers_failed = update.failed;
            report.controllers_removed = update.removed;
        }

        if let Some(snapshot) = self.snapshot() {
            for router in snapshot.controllers().iter().filter_map(|c| c.loaded_router()) {
                let update = router.refresh();
                report.endpoints.loaded += update.loaded;
                report.endpoints.failed += update.failed;
                report.endpoints.removed += update.removed;
            }
        }

        if report.endpoints.changed() || report.endpoints.failed > 0 {
            let failed = report.endpoints.failed;
            self.record(
                ReloadTarget::Endpoints,
                failed == 0,
                (failed > 0).then(|| format!("{failed} endpoint module(s) failed to load")),
            );
        }

        report
    }

    /// Caller holds `reload_lock`.
    fn reload_root(&self) -> Result<u64> {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, SlotState::Loading)
        };
        let path = self.layout.plugin_path();

        let plugin = match self.loader.load::<dyn PluginDescriptor>(&path) {
            Ok(plugin) => Arc::new(plugin),
            Err(e) => {
                *self.state.lock() = previous;
                error!(error = %e, state = %previous, "Root plugin failed to load, keeping current snapshot");
                self.record(ReloadTarget::Plugin, false, Some(e.to_string()));
                return Err(e.into());
            }
        };

        let changes = self.controllers_dir.lock().rescan();
        let mut controllers = BTreeMap::new();
        let mut failed = 0;
        for path in changes.loadable() {
            match Controller::load(&self.loader, path, Arc::clone(&self.layout)) {
                Ok(controller) => {
                    controllers.insert(path.clone(), Arc::new(controller));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load controller");
                    failed += 1;
                }
            }
        }

        info!(
            plugin = %plugin.name(),
            version = %plugin.version(),
            controllers = controllers.len(),
            "Root plugin loaded"
        );

        let generation = self.publish(plugin, controllers.into_values().collect());
        *self.state.lock() = SlotState::Active;
        self.record(
            ReloadTarget::Plugin,
            failed == 0,
            (failed > 0).then(|| format!("{failed} controller(s) failed to load")),
        );
        Ok(generation)
    }

    /// Caller holds `reload_lock`.
    fn update_controllers(&self, changes: &DirectoryChanges) -> ControllerUpdate {
        let mut update = ControllerUpdate::default();
        let Some(snapshot) = self.snapshot() else {
            return update;
        };

        let mut controllers: BTreeMap<PathBuf, Arc<Controller>> = snapshot
            .controllers()
            .iter()
            .map(|c| (c.source().to_path_buf(), Arc::clone(c)))
            .collect();

        for path in &changes.removed {
            if let Some(controller) = controllers.remove(path) {
                info!(controller = %controller.name(), "Controller removed");
                update.removed += 1;
            }
        }

        for path in changes.loadable() {
            match Controller::load(&self.loader, path, Arc::clone(&self.layout)) {
                Ok(controller) => {
                    controllers.insert(path.clone(), Arc::new(controller));
                    update.loaded += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load controller, keeping previous state");
                    update.failed += 1;
                }
            }
        }

        if update.loaded > 0 || update.removed > 0 {
            self.publish(Arc::clone(&snapshot.plugin), controllers.into_values().collect());
        }
        if update.loaded > 0 || update.removed > 0 || update.failed > 0 {
            let failed = update.failed;
            self.record(
                ReloadTarget::Controllers,
                failed == 0,
                (failed > 0).then(|| format!("{failed} controller(s) failed to load")),
            );
        }
        update
    }

    fn publish(&self, plugin: Arc<LoadedPlugin>, controllers: Vec<Arc<Controller>>) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = PluginSnapshot {
            generation,
            plugin,
            controllers,
            published_at: Utc::now(),
        };

        info!(generation, controllers = snapshot.controllers.len(), "Publishing snapshot");
        self.current.store(Some(Arc::new(snapshot)));
        generation
    }

    fn record(&self, target: ReloadTarget, success: bool, error: Option<String>) {
        if success {
            self.counters.reloads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.failed_reloads.fetch_add(1, Ordering::Relaxed);
        }

        let mut history = self.history.lock();
        if history.len() == RELOAD_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(ReloadEvent {
            target,
            generation: self.generation(),
            timestamp: Utc::now(),
            success,
            error,
        });
    }
}
