//! Module loading
//!
//! A module is opened through an [`ImageOpener`], its tier's factory symbol is
//! resolved and called exactly once, and the resulting capability is wrapped in
//! a [`LoadedModule`] that keeps the image mapped for as long as the
//! capability is reachable. Capabilities are shared as `Arc<LoadedModule<_>>`,
//! so an image is released only after the registry and every in-flight call
//! have let go of it.

use crate::error::LoadError;
use crate::native::NativeOpener;
use chrono::{DateTime, Utc};
use hydra_plugin_api::{
    ControllerDescriptor, Endpoint, PluginDescriptor, RouterDescriptor, CREATE_CONTROLLER_SYMBOL,
    CREATE_ENDPOINT_SYMBOL, CREATE_PLUGIN_SYMBOL, CREATE_ROUTER_SYMBOL,
};
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Tier of a loadable module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Root plugin (`createPlugin`)
    Plugin,
    /// Controller (`createController`)
    Controller,
    /// Router (`createRouter`)
    Router,
    /// Endpoint (`createEndpoint`)
    Endpoint,
}

impl ModuleKind {
    /// Well-known factory symbol for this tier
    pub fn factory_symbol(self) -> &'static str {
        match self {
            Self::Plugin => CREATE_PLUGIN_SYMBOL,
            Self::Controller => CREATE_CONTROLLER_SYMBOL,
            Self::Router => CREATE_ROUTER_SYMBOL,
            Self::Endpoint => CREATE_ENDPOINT_SYMBOL,
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plugin => write!(f, "plugin"),
            Self::Controller => write!(f, "controller"),
            Self::Router => write!(f, "router"),
            Self::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// Object produced by a module factory
#[derive(Debug)]
pub enum Capability {
    /// Root plugin descriptor
    Plugin(Box<dyn PluginDescriptor>),
    /// Controller descriptor
    Controller(Box<dyn ControllerDescriptor>),
    /// Router descriptor
    Router(Box<dyn RouterDescriptor>),
    /// Endpoint
    Endpoint(Box<dyn Endpoint>),
}

impl Capability {
    /// Tier this capability belongs to
    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Plugin(_) => ModuleKind::Plugin,
            Self::Controller(_) => ModuleKind::Controller,
            Self::Router(_) => ModuleKind::Router,
            Self::Endpoint(_) => ModuleKind::Endpoint,
        }
    }
}

/// A code image mapped into the process
///
/// Dropping the last reference unmaps the image, so no capability created by
/// [`Image::instantiate`] may outlive it. [`LoadedModule`] enforces that.
pub trait Image: Send + Sync + fmt::Debug {
    /// Path the image was opened from
    fn path(&self) -> &Path;

    /// Resolve the factory for `kind` and invoke it once
    fn instantiate(&self, kind: ModuleKind) -> Result<Capability, LoadError>;
}

/// Opens code images; the OS dynamic loader in production
pub trait ImageOpener: Send + Sync + fmt::Debug {
    /// Map the image at `path`
    fn open(&self, path: &Path) -> Result<Arc<dyn Image>, LoadError>;
}

/// Capability trait objects that can be extracted from a [`Capability`]
pub trait FromCapability {
    /// Tier whose factory produces this capability
    const KIND: ModuleKind;

    /// Unwrap the capability, or `None` if it belongs to another tier
    fn from_capability(capability: Capability) -> Option<Box<Self>>;
}

impl FromCapability for dyn PluginDescriptor {
    const KIND: ModuleKind = ModuleKind::Plugin;

    fn from_capability(capability: Capability) -> Option<Box<Self>> {
        match capability {
            Capability::Plugin(plugin) => Some(plugin),
            _ => None,
        }
    }
}

impl FromCapability for dyn ControllerDescriptor {
    const KIND: ModuleKind = ModuleKind::Controller;

    fn from_capability(capability: Capability) -> Option<Box<Self>> {
        match capability {
            Capability::Controller(controller) => Some(controller),
            _ => None,
        }
    }
}

impl FromCapability for dyn RouterDescriptor {
    const KIND: ModuleKind = ModuleKind::Router;

    fn from_capability(capability: Capability) -> Option<Box<Self>> {
        match capability {
            Capability::Router(router) => Some(router),
            _ => None,
        }
    }
}

impl FromCapability for dyn Endpoint {
    const KIND: ModuleKind = ModuleKind::Endpoint;

    fn from_capability(capability: Capability) -> Option<Box<Self>> {
        match capability {
            Capability::Endpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }
}

/// A capability together with the image that holds its code
pub struct LoadedModule<T: ?Sized> {
    // Field order matters: the instance drops before the image is released.
    instance: Box<T>,
    image: Arc<dyn Image>,
    loaded_at: DateTime<Utc>,
}

/// Loaded root plugin
pub type LoadedPlugin = LoadedModule<dyn PluginDescriptor>;

/// Loaded controller descriptor
pub type LoadedController = LoadedModule<dyn ControllerDescriptor>;

/// Loaded router descriptor
pub type LoadedRouter = LoadedModule<dyn RouterDescriptor>;

/// Loaded endpoint
pub type LoadedEndpoint = LoadedModule<dyn Endpoint>;

impl<T: ?Sized> LoadedModule<T> {
    /// Path the module was loaded from
    pub fn path(&self) -> &Path {
        self.image.path()
    }

    /// When the module was loaded
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl<T: ?Sized> Deref for LoadedModule<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for LoadedModule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("instance", &self.instance)
            .field("path", &self.image.path())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Loads modules of every tier through one [`ImageOpener`]
#[derive(Clone, Debug)]
pub struct ModuleLoader {
    opener: Arc<dyn ImageOpener>,
}

impl ModuleLoader {
    /// Create a loader over a custom opener
    pub fn new(opener: Arc<dyn ImageOpener>) -> Self {
        Self { opener }
    }

    /// Create a loader backed by the OS dynamic loader
    pub fn native() -> Self {
        Self::new(Arc::new(NativeOpener::new()))
    }

    /// Load the module at `path` and instantiate its capability
    ///
    /// The factory is invoked exactly once. Failures leave nothing mapped.
    pub fn load<T>(&self, path: &Path) -> Result<LoadedModule<T>, LoadError>
    where
        T: ?Sized + FromCapability,
    {
        let image = self.opener.open(path)?;
        let capability = image.instantiate(T::KIND)?;
        let instance = T::from_capability(capability).ok_or_else(|| LoadError::KindMismatch {
            path: path.to_path_buf(),
            expected: T::KIND,
        })?;

        debug!(path = %path.display(), kind = %T::KIND, "Module loaded");

        Ok(LoadedModule {
            instance,
            image,
            loaded_at: Utc::now(),
        })
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::native()
    }
}
