//! Shared fixture: an on-disk module tree backed by a StaticOpener

#![allow(dead_code)]

use hydra_plugin_api::testing::{StaticController, StaticEndpoint, StaticPlugin, StaticRouter};
use hydra_plugin_api::Endpoint;
use hydra_plugin_runtime::testing::{touch, StaticOpener};
use hydra_plugin_runtime::{ModuleLayout, ModuleLoader, PluginManager};
use libloading::library_filename;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct ModuleTree {
    pub dir: TempDir,
    pub opener: Arc<StaticOpener>,
    pub layout: ModuleLayout,
    tick: u64,
}

impl ModuleTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path()).with_extensions(["so"]);
        std::fs::create_dir_all(layout.endpoints_dir(None)).unwrap();
        std::fs::create_dir_all(layout.controllers_dir()).unwrap();
        Self {
            dir,
            opener: StaticOpener::new(),
            layout,
            tick: 0,
        }
    }

    /// Tree with a root plugin and one controller routing through `api_router`
    pub fn with_app() -> Self {
        let mut tree = Self::new();
        tree.plugin("1.0.0");
        tree.controller("time_controller.so", "time_controller", "api_router");
        tree
    }

    pub fn manager(&self) -> Arc<PluginManager> {
        Arc::new(PluginManager::new(
            ModuleLoader::new(self.opener.clone()),
            self.layout.clone(),
        ))
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn plugin(&mut self, version: &str) {
        let path = self.layout.plugin_path();
        let name = file_name(&path);
        self.opener.plugin(&name, StaticPlugin::new("application-manager", version));
        let tick = self.next_tick();
        touch(&path, tick);
    }

    /// Rewrite the root plugin file with something that does not load
    pub fn break_plugin(&mut self) {
        let path = self.layout.plugin_path();
        self.opener.unregister(&file_name(&path));
        let tick = self.next_tick();
        touch(&path, tick);
    }

    pub fn controller(&mut self, file: &str, name: &str, router: &str) {
        self.opener.controller(file, StaticController::new(name, router));
        let tick = self.next_tick();
        touch(&self.layout.controllers_dir().join(file), tick);
        self.router(router);
    }

    pub fn router(&mut self, name: &str) {
        let file = library_filename(name).to_string_lossy().into_owned();
        self.opener.router(&file, StaticRouter::new(name));
        let tick = self.next_tick();
        touch(&self.layout.router_path(name), tick);
    }

    pub fn endpoint(&mut self, file: &str, path: &str, method: &str, body: &str) {
        self.endpoint_with(file, StaticEndpoint::new(path, method, body));
    }

    pub fn endpoint_with<E: Endpoint + Clone + 'static>(&mut self, file: &str, endpoint: E) {
        self.opener.endpoint(file, endpoint);
        let tick = self.next_tick();
        touch(&self.endpoint_path(file), tick);
    }

    pub fn remove_endpoint(&self, file: &str) {
        std::fs::remove_file(self.endpoint_path(file)).unwrap();
    }

    pub fn endpoint_path(&self, file: &str) -> PathBuf {
        self.layout.endpoints_dir(None).join(file)
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
