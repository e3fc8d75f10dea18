//! Background reload scheduler

use crate::manager::PluginManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls a [`PluginManager`] on a fixed interval
///
/// This is the only place module directories are polled during normal
/// operation. Each cycle runs on the blocking pool because loading modules
/// does file and loader I/O.
#[derive(Debug)]
pub struct ReloadScheduler {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReloadScheduler {
    /// Start polling `manager` every `interval`
    pub fn spawn(manager: Arc<PluginManager>, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(manager, interval, token.clone()));

        info!(interval = ?interval, "Reload scheduler started");
        Self { token, handle }
    }

    /// Token that stops the scheduler when cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop polling and wait for the current cycle to finish
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Reload scheduler task failed");
        }
        info!("Reload scheduler stopped");
    }
}

async fn run(manager: Arc<PluginManager>, interval: Duration, token: CancellationToken) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the manager was just loaded.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let manager = Arc::clone(&manager);
        match tokio::task::spawn_blocking(move || manager.poll()).await {
            Ok(report) if report.published() => {
                debug!(?report, "Reload cycle published a new snapshot");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Reload cycle panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ModuleLayout;
    use crate::loader::ModuleLoader;
    use crate::testing::{touch, StaticOpener};
    use hydra_core::DispatchStatus;
    use hydra_plugin_api::testing::{StaticController, StaticEndpoint, StaticPlugin, StaticRouter};
    use libloading::library_filename;

    #[tokio::test]
    async fn test_scheduler_picks_up_new_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path()).with_extensions(["so"]);
        let opener = StaticOpener::new();

        let plugin_path = layout.plugin_path();
        let plugin_file = plugin_path.file_name().unwrap().to_string_lossy().into_owned();
        opener.plugin(&plugin_file, StaticPlugin::new("app", "1.0.0"));
        touch(&plugin_path, 1);

        opener.controller("time.so", StaticController::new("time_controller", "api_router"));
        touch(&dir.path().join("controllers/time.so"), 1);
        let router_file = library_filename("api_router").to_string_lossy().into_owned();
        opener.router(&router_file, StaticRouter::new("api_router"));
        touch(&layout.router_path("api_router"), 1);
        std::fs::create_dir_all(dir.path().join("endpoints")).unwrap();

        let manager = Arc::new(PluginManager::new(ModuleLoader::new(opener.clone()), layout));
        manager.load().unwrap();
        assert_eq!(
            manager.dispatch("/new", "GET", b"").status,
            DispatchStatus::NotFound
        );

        opener.endpoint("new.so", StaticEndpoint::new("/new", "GET", "new"));
        touch(&dir.path().join("endpoints/new.so"), 1);

        let scheduler = ReloadScheduler::spawn(Arc::clone(&manager), Duration::from_millis(10));
        let mut found = false;
        for _ in 0..200 {
            if manager.dispatch("/new", "GET", b"").is_ok() {
                found = true;
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        scheduler.shutdown().await;

        assert!(found);
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(PluginManager::new(
            ModuleLoader::new(StaticOpener::new()),
            ModuleLayout::new(dir.path()),
        ));

        let scheduler = ReloadScheduler::spawn(manager, Duration::from_millis(5));
        let token = scheduler.token();
        scheduler.shutdown().await;
        assert!(token.is_cancelled());
    }
}
