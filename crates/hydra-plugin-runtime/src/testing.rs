//! In-memory module backend for tests
//!
//! [`StaticOpener`] stands in for the OS loader: opening a file succeeds only
//! if the file exists on disk and a factory is registered under its file
//! name. The factory is captured at open time, like a real image whose code
//! is fixed once mapped, so re-registering a name and touching the file
//! simulates rebuilding a module.

use crate::error::LoadError;
use crate::loader::{Capability, Image, ImageOpener, ModuleKind};
use hydra_plugin_api::{ControllerDescriptor, Endpoint, PluginDescriptor, RouterDescriptor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

type Factory = Arc<dyn Fn(ModuleKind) -> Option<Capability> + Send + Sync>;

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    live: AtomicUsize,
}

/// Opener backed by registered factories instead of native code
#[derive(Default)]
pub struct StaticOpener {
    factories: Mutex<HashMap<String, Factory>>,
    counters: Arc<Counters>,
}

impl StaticOpener {
    /// Create an empty opener
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a raw factory for files named `file_name`
    pub fn register<F>(&self, file_name: &str, factory: F)
    where
        F: Fn(ModuleKind) -> Option<Capability> + Send + Sync + 'static,
    {
        self.factories
            .lock()
            .insert(file_name.to_string(), Arc::new(factory));
    }

    /// Make files named `file_name` unopenable
    pub fn unregister(&self, file_name: &str) {
        self.factories.lock().remove(file_name);
    }

    /// Register an endpoint module
    pub fn endpoint<E>(&self, file_name: &str, endpoint: E)
    where
        E: Endpoint + Clone + 'static,
    {
        self.register(file_name, move |kind| {
            (kind == ModuleKind::Endpoint).then(|| Capability::Endpoint(Box::new(endpoint.clone())))
        });
    }

    /// Register a router module
    pub fn router<R>(&self, file_name: &str, router: R)
    where
        R: RouterDescriptor + Clone + 'static,
    {
        self.register(file_name, move |kind| {
            (kind == ModuleKind::Router).then(|| Capability::Router(Box::new(router.clone())))
        });
    }

    /// Register a controller module
    pub fn controller<C>(&self, file_name: &str, controller: C)
    where
        C: ControllerDescriptor + Clone + 'static,
    {
        self.register(file_name, move |kind| {
            (kind == ModuleKind::Controller)
                .then(|| Capability::Controller(Box::new(controller.clone())))
        });
    }

    /// Register a root plugin module
    pub fn plugin<P>(&self, file_name: &str, plugin: P)
    where
        P: PluginDescriptor + Clone + 'static,
    {
        self.register(file_name, move |kind| {
            (kind == ModuleKind::Plugin).then(|| Capability::Plugin(Box::new(plugin.clone())))
        });
    }

    /// Images opened so far
    pub fn opened_images(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Images opened and not yet released
    pub fn live_images(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for StaticOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.factories.lock().keys().cloned().collect();
        names.sort();
        f.debug_struct("StaticOpener")
            .field("factories", &names)
            .field("counters", &self.counters)
            .finish()
    }
}

impl ImageOpener for StaticOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn Image>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::open_failed(path, "no such file"));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let factory = self
            .factories
            .lock()
            .get(&name)
            .cloned()
            .ok_or_else(|| LoadError::open_failed(path, "not a loadable image"))?;

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(StaticImage {
            path: path.to_path_buf(),
            factory,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct StaticImage {
    path: PathBuf,
    factory: Factory,
    counters: Arc<Counters>,
}

impl Image for StaticImage {
    fn path(&self) -> &Path {
        &self.path
    }

    fn instantiate(&self, kind: ModuleKind) -> Result<Capability, LoadError> {
        (self.factory)(kind).ok_or_else(|| LoadError::SymbolNotFound {
            path: self.path.clone(),
            symbol: kind.factory_symbol(),
        })
    }
}

impl fmt::Debug for StaticImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticImage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for StaticImage {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Create `path` if needed and set its mtime to a fixed instant plus `offset` seconds
///
/// The instant lies far in the past, so touched files always count as settled.
pub fn touch(path: &Path, offset: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("open module file");
    let mtime = UNIX_EPOCH + Duration::from_secs(1_600_000_000 + offset);
    file.set_modified(mtime).expect("set mtime");
}

