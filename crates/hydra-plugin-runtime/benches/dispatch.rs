// Dispatch benchmarks for the Hydra plugin runtime
//
// Run with: cargo bench -p hydra-plugin-runtime --bench dispatch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hydra_plugin_api::testing::{StaticController, StaticEndpoint, StaticPlugin, StaticRouter};
use hydra_plugin_runtime::testing::{touch, StaticOpener};
use hydra_plugin_runtime::{ModuleLayout, ModuleLoader, PluginManager};
use libloading::library_filename;
use std::sync::Arc;
use tempfile::TempDir;

fn loaded_manager(endpoints: usize) -> (TempDir, Arc<PluginManager>) {
    let dir = tempfile::tempdir().unwrap();
    let layout = ModuleLayout::new(dir.path()).with_extensions(["so"]);
    let opener = StaticOpener::new();

    let plugin_path = layout.plugin_path();
    let plugin_file = plugin_path.file_name().unwrap().to_string_lossy().into_owned();
    opener.plugin(&plugin_file, StaticPlugin::new("bench", "1.0.0"));
    touch(&plugin_path, 1);

    opener.controller("api.so", StaticController::new("api", "api_router"));
    touch(&layout.controllers_dir().join("api.so"), 1);
    let router_file = library_filename("api_router").to_string_lossy().into_owned();
    opener.router(&router_file, StaticRouter::new("api_router"));
    touch(&layout.router_path("api_router"), 1);

    for i in 0..endpoints {
        let file = format!("e{i:04}.so");
        let route = format!("/route/{i}");
        opener.endpoint(&file, StaticEndpoint::new(&route, "GET", "ok"));
        touch(&layout.endpoints_dir(None).join(&file), 1);
    }

    let manager = Arc::new(PluginManager::new(ModuleLoader::new(opener), layout));
    manager.load().unwrap();
    // Load the router outside the measurement.
    manager.dispatch("/route/0", "GET", b"");
    (dir, manager)
}

fn benchmark_dispatch_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_hit");
    group.throughput(Throughput::Elements(1));

    for endpoints in [1, 16, 256] {
        let (_dir, manager) = loaded_manager(endpoints);
        let path = format!("/route/{}", endpoints - 1);
        group.bench_with_input(BenchmarkId::from_parameter(endpoints), &path, |b, path| {
            b.iter(|| black_box(manager.dispatch(black_box(path), "GET", b"")))
        });
    }

    group.finish();
}

fn benchmark_dispatch_miss(c: &mut Criterion) {
    let (_dir, manager) = loaded_manager(16);
    c.bench_function("dispatch_miss", |b| {
        b.iter(|| black_box(manager.dispatch(black_box("/nowhere"), "GET", b"")))
    });
}

fn benchmark_idle_poll(c: &mut Criterion) {
    let (_dir, manager) = loaded_manager(16);
    c.bench_function("idle_poll", |b| b.iter(|| black_box(manager.poll())));
}

criterion_group!(
    benches,
    benchmark_dispatch_hit,
    benchmark_dispatch_miss,
    benchmark_idle_poll
);
criterion_main!(benches);
