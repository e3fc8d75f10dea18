//! Hot reload of real shared libraries built from the sample modules

use hydra_core::DispatchStatus;
use hydra_plugin_runtime::testing::touch;
use hydra_plugin_runtime::{ModuleLayout, ModuleLoader, NativeOpener, PluginManager};
use libloading::library_filename;
use std::env::consts::DLL_EXTENSION;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};

const HELLO_BODY: &str = "👋 Hello from hot-reloaded endpoint!";

static MODULES: OnceLock<PathBuf> = OnceLock::new();

fn cargo_bin() -> String {
    std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string())
}

/// Build the sample modules once and return the directory holding them
fn built_modules() -> &'static Path {
    MODULES.get_or_init(|| {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../Cargo.toml");
        let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("native-modules");

        let status = Command::new(cargo_bin())
            .arg("build")
            .arg("--manifest-path")
            .arg(&manifest)
            .args(["-p", "app-plugin"])
            .args(["-p", "time-controller"])
            .args(["-p", "api-router"])
            .args(["-p", "hello-endpoint"])
            .args(["-p", "new-endpoint"])
            .arg("--target-dir")
            .arg(&target_dir)
            .status()
            .expect("run cargo build for sample modules");
        assert!(status.success(), "building sample modules failed: {status}");

        target_dir.join("debug")
    })
}

fn install(module: &str, dest: &Path, offset: u64) {
    let built = built_modules().join(library_filename(module));
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::copy(&built, dest).unwrap_or_else(|e| panic!("copy {}: {e}", built.display()));
    touch(dest, offset);
}

fn shadow_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().extension() == Some(OsStr::new(DLL_EXTENSION)))
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn test_replaced_library_swaps_route_and_keeps_in_flight_handle() {
    let root = tempfile::tempdir().unwrap();
    let shadow_dir = root.path().join("shadow");
    let layout = ModuleLayout::new(root.path().join("modules"));

    install("plugin", &layout.plugin_path(), 1);
    install(
        "time_controller",
        &layout.controllers_dir().join(library_filename("time_controller")),
        2,
    );
    install("api_router", &layout.router_path("api_router"), 3);
    let endpoint_file = layout
        .endpoints_dir(None)
        .join(format!("ep.{DLL_EXTENSION}"));
    install("hello_endpoint", &endpoint_file, 4);

    let opener = NativeOpener::with_shadow_dir(&shadow_dir);
    let manager = PluginManager::new(ModuleLoader::new(Arc::new(opener)), layout);
    manager.load().unwrap();

    let response = manager.dispatch("/hello", "GET", b"");
    assert_eq!(response.status, DispatchStatus::Ok);
    assert_eq!(response.text(), HELLO_BODY);

    let router = manager.snapshot().unwrap().controllers()[0]
        .router()
        .expect("api_router loaded");
    let in_flight = router.resolve("/hello", "GET").expect("hello registered");
    assert_eq!(shadow_count(&shadow_dir), 4);

    // Rebuild the endpoint file in place with a different module.
    install("new_endpoint", &endpoint_file, 10);
    let report = manager.poll();
    assert_eq!(report.endpoints.loaded, 1);

    assert_eq!(manager.dispatch("/new", "GET", b"").status, DispatchStatus::Ok);
    assert_eq!(
        manager.dispatch("/hello", "GET", b"").status,
        DispatchStatus::NotFound
    );

    // The replaced image stays mapped while a request still holds it.
    assert_eq!(String::from_utf8(in_flight.handle(b"")).unwrap(), HELLO_BODY);
    assert_eq!(shadow_count(&shadow_dir), 5);

    drop(in_flight);
    assert_eq!(shadow_count(&shadow_dir), 4);

    drop(router);
    drop(manager);
    assert_eq!(shadow_count(&shadow_dir), 0);
}
