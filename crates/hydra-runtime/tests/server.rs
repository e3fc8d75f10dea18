//! End-to-end tests over a real TCP listener

use hydra_config::ConfigBuilder;
use hydra_plugin_api::testing::{FnEndpoint, StaticController, StaticEndpoint, StaticPlugin, StaticRouter};
use hydra_plugin_runtime::testing::{touch, StaticOpener};
use hydra_plugin_runtime::{ModuleLayout, ModuleLoader, PluginManager};
use hydra_runtime::{RuntimeState, Server};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn lib(name: &str) -> String {
    format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
}

fn app(dir: &std::path::Path) -> (Arc<StaticOpener>, ModuleLayout) {
    let opener = StaticOpener::new();
    let layout = ModuleLayout::new(dir).with_extensions(["so"]);

    opener.plugin(&lib("plugin"), StaticPlugin::new("application-manager", "1.0.0"));
    touch(&layout.plugin_path(), 1);
    opener.controller("time_controller.so", StaticController::new("time_controller", "api_router"));
    touch(&layout.controllers_dir().join("time_controller.so"), 2);
    opener.router(&lib("api_router"), StaticRouter::new("api_router"));
    touch(&layout.router_path("api_router"), 3);
    opener.endpoint(
        "hello.so",
        StaticEndpoint::new("/hello", "GET", "👋 Hello from hot-reloaded endpoint!"),
    );
    touch(&layout.endpoints_dir(None).join("hello.so"), 4);
    opener.endpoint(
        "echo.so",
        FnEndpoint::new("/echo", "POST", |body| {
            format!("📢 Echo: {}", String::from_utf8_lossy(body)).into_bytes()
        }),
    );
    touch(&layout.endpoints_dir(None).join("echo.so"), 5);

    (opener, layout)
}

async fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let status = response[9..12].parse().unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

async fn start(manager: Arc<PluginManager>, poll: Option<Duration>) -> (Arc<Server>, SocketAddr) {
    let mut builder = ConfigBuilder::new().max_body_size(64);
    builder = match poll {
        Some(interval) => builder.poll_interval(interval),
        None => builder.reload(false),
    };
    let config = builder.build().unwrap();

    let server = Arc::new(Server::builder().config(config).manager(manager).build().unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let running = Arc::clone(&server);
    tokio::spawn(async move { running.serve(listener).await });
    (server, addr)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serves_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let (opener, layout) = app(dir.path());
    let manager = Arc::new(PluginManager::new(ModuleLoader::new(opener), layout));
    manager.load().unwrap();

    let (server, addr) = start(manager, None).await;

    let (status, body) = request(addr, "GET", "/hello", "").await;
    assert_eq!(status, 200);
    assert_eq!(body, "👋 Hello from hot-reloaded endpoint!");

    let (status, body) = request(addr, "POST", "/echo", "ping").await;
    assert_eq!(status, 200);
    assert_eq!(body, "📢 Echo: ping");

    let (status, body) = request(addr, "GET", "/echo", "").await;
    assert_eq!(status, 404);
    assert_eq!(body, "404 - Endpoint not found");

    let (status, _) = request(addr, "POST", "/echo", &"x".repeat(65)).await;
    assert_eq!(status, 413);

    server.shutdown_signal().trigger();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unavailable_until_plugin_loads() {
    let dir = tempfile::tempdir().unwrap();
    let opener = StaticOpener::new();
    let layout = ModuleLayout::new(dir.path()).with_extensions(["so"]);
    let manager = Arc::new(PluginManager::new(ModuleLoader::new(opener), layout));
    let _ = manager.load();

    let (server, addr) = start(manager, None).await;

    let (status, body) = request(addr, "GET", "/hello", "").await;
    assert_eq!(status, 503);
    assert_eq!(body, "Plugin not loaded");

    let (status, _) = request(addr, "GET", "/__admin/health", "").await;
    assert_eq!(status, 503);

    server.shutdown_signal().trigger();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_endpoint_served_after_poll() {
    let dir = tempfile::tempdir().unwrap();
    let (opener, layout) = app(dir.path());
    let new_file = layout.endpoints_dir(None).join("new.so");
    let manager = Arc::new(PluginManager::new(ModuleLoader::new(opener.clone()), layout));
    manager.load().unwrap();

    let (server, addr) = start(manager, Some(Duration::from_millis(20))).await;

    let (status, _) = request(addr, "GET", "/new", "").await;
    assert_eq!(status, 404);

    opener.endpoint(
        "new.so",
        StaticEndpoint::new("/new", "GET", "🆕 This endpoint was added via hot reload!"),
    );
    touch(&new_file, 10);

    let mut served = None;
    for _ in 0..100 {
        let (status, body) = request(addr, "GET", "/new", "").await;
        if status == 200 {
            served = Some(body);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(served.as_deref(), Some("🆕 This endpoint was added via hot reload!"));

    let (status, body) = request(addr, "GET", "/__admin/routes", "").await;
    assert_eq!(status, 200);
    let routes: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(routes.as_array().unwrap().len(), 3);

    server.shutdown_signal().trigger();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_stops_server() {
    let dir = tempfile::tempdir().unwrap();
    let (opener, layout) = app(dir.path());
    let manager = Arc::new(PluginManager::new(ModuleLoader::new(opener), layout));
    manager.load().unwrap();

    let (server, addr) = start(manager, Some(Duration::from_millis(20))).await;
    let (status, _) = request(addr, "GET", "/hello", "").await;
    assert_eq!(status, 200);

    server.shutdown_signal().trigger();
    for _ in 0..50 {
        if server.state().await == RuntimeState::Stopped {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.state().await, RuntimeState::Stopped);
    assert_eq!(server.in_flight(), 0);
}
