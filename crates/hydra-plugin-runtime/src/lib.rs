//! # Hydra Plugin Runtime
//!
//! Loads native modules from disk and swaps them in place while requests keep
//! flowing.
//!
//! ## Features
//!
//! - **Module Loading**: Factory-symbol lookup over `libloading`, with image
//!   lifetimes tied to the capabilities created from them
//! - **Change Detection**: mtime polling of single files and directories
//! - **Snapshots**: The Plugin → Controller → Router → Endpoint graph is
//!   published atomically, one generation at a time
//! - **Hot Reload**: A background scheduler polls and republishes
//!
//! ## Example
//!
//! ```rust,no_run
//! use hydra_plugin_runtime::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<()> {
//! let layout = ModuleLayout::new("/srv/hydra");
//! let manager = Arc::new(PluginManager::new(ModuleLoader::native(), layout));
//! manager.load()?;
//!
//! let scheduler = ReloadScheduler::spawn(Arc::clone(&manager), Duration::from_secs(1));
//!
//! let response = manager.dispatch("/hello", "GET", b"");
//! println!("{}: {}", response.status, response.text());
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod controller;
pub mod dispatch;
pub mod error;
pub mod layout;
pub mod loader;
pub mod manager;
#[allow(unsafe_code)]
pub mod native;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod watch;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use controller::Controller;
pub use dispatch::dispatch;
pub use error::{LoadError, PluginRuntimeError, Result};
pub use layout::ModuleLayout;
pub use loader::{
    Capability, FromCapability, Image, ImageOpener, LoadedController, LoadedEndpoint,
    LoadedModule, LoadedPlugin, LoadedRouter, ModuleKind, ModuleLoader,
};
pub use manager::{
    PluginManager, PluginSnapshot, PollReport, ReloadEvent, ReloadTarget, RuntimeStats, SlotState,
};
pub use native::{NativeOpener, ShadowCleanup, SHADOW_CLEANUP_GRACE};
pub use registry::{EndpointRegistry, EndpointTable, RegisteredEndpoint, RegistryUpdate};
pub use router::Router;
pub use scheduler::{ReloadScheduler, DEFAULT_POLL_INTERVAL};
pub use watch::{DirectoryChanges, DirectoryWatcher, FileStatus, HotFile};

// Re-export the module contract for convenience
pub use hydra_plugin_api::{
    ControllerDescriptor, Endpoint, PluginDescriptor, PluginMetadata, RouteInfo, RouteKey,
    RouterDescriptor,
};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::error::{LoadError, PluginRuntimeError, Result};
    pub use crate::layout::ModuleLayout;
    pub use crate::loader::ModuleLoader;
    pub use crate::manager::{PluginManager, PluginSnapshot, SlotState};
    pub use crate::scheduler::ReloadScheduler;
    pub use hydra_plugin_api::prelude::*;
}
