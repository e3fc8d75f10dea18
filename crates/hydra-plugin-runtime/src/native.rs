//! OS dynamic loader backend
//!
//! The dynamic loader hands back the already-mapped handle when the same path
//! is opened twice, so a rebuilt module would never be picked up. Each open
//! therefore copies the module to a unique shadow file and maps that copy.
//! The shadow file is removed once its image is unmapped. Copies left behind
//! by processes that did not shut down cleanly are removed by
//! [`NativeOpener::cleanup_stale_shadows`].

use crate::error::LoadError;
use crate::loader::{Capability, Image, ImageOpener, ModuleKind};
use hydra_plugin_api::{CreateControllerFn, CreateEndpointFn, CreatePluginFn, CreateRouterFn};
use libloading::{Library, Symbol};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use std::{fs, io};
use tracing::{debug, info, warn};

/// Shadow copies of other processes younger than this are left alone
pub const SHADOW_CLEANUP_GRACE: Duration = Duration::from_secs(60);

/// Outcome of one stale shadow cleanup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowCleanup {
    /// Files inspected
    pub scanned: usize,
    /// Stale copies deleted
    pub deleted: usize,
    /// Stale copies that could not be deleted
    pub failed: usize,
    /// Copies owned by this process
    pub skipped_current: usize,
    /// Copies younger than the grace period
    pub skipped_recent: usize,
    /// Files not named like a shadow copy
    pub skipped_unrecognized: usize,
}

/// Opens modules with `libloading`
#[derive(Debug)]
pub struct NativeOpener {
    shadow_dir: Option<PathBuf>,
    seq: AtomicU64,
}

impl NativeOpener {
    /// Opener that maps shadow copies under the system temp directory
    ///
    /// The directory is shared by every process on the host; copies are
    /// prefixed with the owning process id.
    pub fn new() -> Self {
        Self::with_shadow_dir(std::env::temp_dir().join("hydra-shadow"))
    }

    /// Opener that maps shadow copies under `dir`
    pub fn with_shadow_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            shadow_dir: Some(dir.into()),
            seq: AtomicU64::new(0),
        }
    }

    /// Opener that maps modules in place
    ///
    /// Only suitable when module files are replaced under new names.
    pub fn in_place() -> Self {
        Self {
            shadow_dir: None,
            seq: AtomicU64::new(0),
        }
    }

    /// Directory holding shadow copies, if any
    pub fn shadow_dir(&self) -> Option<&Path> {
        self.shadow_dir.as_deref()
    }

    /// Delete shadow copies left behind by other processes
    ///
    /// Copies owned by this process are removed when their image unloads and
    /// are never touched here. Copies of other processes are deleted once
    /// they are older than `grace`. A copy still mapped by a live process is
    /// unaffected on Unix; elsewhere the delete fails and is reported.
    pub fn cleanup_stale_shadows(&self, grace: Duration) -> ShadowCleanup {
        match &self.shadow_dir {
            Some(dir) => cleanup_stale_shadows_in_dir(dir, std::process::id(), grace),
            None => ShadowCleanup::default(),
        }
    }

    fn shadow_copy(&self, dir: &Path, path: &Path) -> Result<ShadowFile, LoadError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| LoadError::open_failed(path, "path has no file name"))?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let shadow = dir.join(format!(
            "{}-{seq}-{}",
            std::process::id(),
            file_name.to_string_lossy()
        ));

        fs::create_dir_all(dir).map_err(|e| LoadError::open_failed(path, e))?;
        fs::copy(path, &shadow).map_err(|e| LoadError::open_failed(path, e))?;

        Ok(ShadowFile(shadow))
    }
}

impl Default for NativeOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageOpener for NativeOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn Image>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::open_failed(path, "no such file"));
        }

        let shadow = match &self.shadow_dir {
            Some(dir) => Some(self.shadow_copy(dir, path)?),
            None => None,
        };
        let mapped = shadow.as_ref().map_or(path, |s| s.0.as_path());

        // SAFETY: mapping a module runs its initializers. Modules are trusted
        // code built against the same hydra-plugin-api as the host.
        let library =
            unsafe { Library::new(mapped) }.map_err(|e| LoadError::open_failed(path, e))?;

        debug!(path = %path.display(), mapped = %mapped.display(), "Mapped module image");

        Ok(Arc::new(NativeImage {
            path: path.to_path_buf(),
            library,
            _shadow: shadow,
        }))
    }
}

struct NativeImage {
    path: PathBuf,
    // Dropped before the shadow file is removed.
    library: Library,
    _shadow: Option<ShadowFile>,
}

impl NativeImage {
    fn factory<F: Copy>(&self, kind: ModuleKind) -> Result<F, LoadError> {
        let symbol = kind.factory_symbol();
        // SAFETY: `F` is the factory signature the export macros pair with
        // `symbol`. The returned fn pointer is only called while `self`
        // keeps the library mapped.
        let factory: Symbol<'_, F> =
            unsafe { self.library.get(symbol.as_bytes()) }.map_err(|_| {
                LoadError::SymbolNotFound {
                    path: self.path.clone(),
                    symbol,
                }
            })?;
        Ok(*factory)
    }
}

impl Image for NativeImage {
    fn path(&self) -> &Path {
        &self.path
    }

    fn instantiate(&self, kind: ModuleKind) -> Result<Capability, LoadError> {
        let capability = match kind {
            ModuleKind::Plugin => Capability::Plugin(self.factory::<CreatePluginFn>(kind)?()),
            ModuleKind::Controller => {
                Capability::Controller(self.factory::<CreateControllerFn>(kind)?())
            }
            ModuleKind::Router => Capability::Router(self.factory::<CreateRouterFn>(kind)?()),
            ModuleKind::Endpoint => {
                Capability::Endpoint(self.factory::<CreateEndpointFn>(kind)?())
            }
        };
        Ok(capability)
    }
}

impl fmt::Debug for NativeImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeImage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for NativeImage {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Unloading module image");
    }
}

struct ShadowFile(PathBuf);

impl Drop for ShadowFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.0) {
            Ok(()) => {}
            // Another process's cleanup got here first.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.0.display(), error = %e, "Failed to remove shadow copy");
            }
        }
    }
}

/// Owning process id of a `{pid}-{seq}-{file}` shadow copy name
fn parse_shadow_pid(name: &str) -> Option<u32> {
    let (pid, rest) = name.split_once('-')?;
    let (seq, file) = rest.split_once('-')?;
    if file.is_empty() || seq.parse::<u64>().is_err() {
        return None;
    }
    pid.parse().ok()
}

fn cleanup_stale_shadows_in_dir(dir: &Path, current_pid: u32, grace: Duration) -> ShadowCleanup {
    let mut report = ShadowCleanup::default();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read shadow directory");
            return report;
        }
    };

    let now = SystemTime::now();
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        report.scanned += 1;

        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(parse_shadow_pid) else {
            report.skipped_unrecognized += 1;
            continue;
        };
        if pid == current_pid {
            report.skipped_current += 1;
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < grace {
            report.skipped_recent += 1;
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to remove stale shadow copy");
                report.failed += 1;
            }
        }
    }

    if report.deleted > 0 || report.failed > 0 {
        info!(
            dir = %dir.display(),
            deleted = report.deleted,
            failed = report.failed,
            skipped_recent = report.skipped_recent,
            "Stale shadow copies cleaned up"
        );
    }
    report
}
