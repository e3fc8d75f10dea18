//! On-disk module layout

use libloading::library_filename;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where modules live relative to a root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Root directory all other paths are relative to
    pub root: PathBuf,
    /// Root plugin module file
    pub plugin: PathBuf,
    /// Controller module directory
    pub controllers: PathBuf,
    /// Router companion module directory
    pub routers: PathBuf,
    /// Default endpoint module directory
    pub endpoints: PathBuf,
    /// Recognized module file extensions, without the dot
    pub extensions: Vec<String>,
    /// Files younger than this are left for a later poll
    pub settle: Option<Duration>,
}

impl ModuleLayout {
    /// Conventional layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            plugin: Path::new("bin").join(library_filename("plugin")),
            controllers: PathBuf::from("controllers"),
            routers: PathBuf::from("routers"),
            endpoints: PathBuf::from("endpoints"),
            extensions: vec![std::env::consts::DLL_EXTENSION.to_string()],
            settle: None,
        }
    }

    /// Set the settle window
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = Some(settle);
        self
    }

    /// Replace the recognized extensions
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Absolute path of the root plugin module
    pub fn plugin_path(&self) -> PathBuf {
        self.root.join(&self.plugin)
    }

    /// Absolute path of the controllers directory
    pub fn controllers_dir(&self) -> PathBuf {
        self.root.join(&self.controllers)
    }

    /// Absolute path of the routers directory
    pub fn routers_dir(&self) -> PathBuf {
        self.root.join(&self.routers)
    }

    /// Module file for the router named `name`, e.g. `routers/libweb_router.so`
    pub fn router_path(&self, name: &str) -> PathBuf {
        self.routers_dir().join(library_filename(name))
    }

    /// Endpoint directory for a router, honoring its override
    pub fn endpoints_dir(&self, router_override: Option<&str>) -> PathBuf {
        match router_override {
            Some(dir) => self.root.join(dir),
            None => self.root.join(&self.endpoints),
        }
    }
}

impl Default for ModuleLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_paths() {
        let layout = ModuleLayout::new("/srv/hydra");

        assert_eq!(layout.controllers_dir(), PathBuf::from("/srv/hydra/controllers"));
        assert_eq!(layout.routers_dir(), PathBuf::from("/srv/hydra/routers"));
        assert_eq!(
            layout.plugin_path(),
            Path::new("/srv/hydra/bin").join(library_filename("plugin"))
        );
        assert_eq!(
            layout.router_path("web_router"),
            Path::new("/srv/hydra/routers").join(library_filename("web_router"))
        );
        assert_eq!(layout.extensions, vec![std::env::consts::DLL_EXTENSION]);
    }

    #[test]
    fn test_endpoint_dir_override() {
        let layout = ModuleLayout::new("/srv/hydra");

        assert_eq!(layout.endpoints_dir(None), PathBuf::from("/srv/hydra/endpoints"));
        assert_eq!(
            layout.endpoints_dir(Some("api/endpoints")),
            PathBuf::from("/srv/hydra/api/endpoints")
        );
    }
}
