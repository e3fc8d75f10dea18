//! Configuration types

use hydra_plugin_runtime::ModuleLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Module layout
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Reload scheduler
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Module layout described by this configuration
    pub fn to_layout(&self) -> ModuleLayout {
        let modules = &self.modules;
        let mut layout = ModuleLayout::new(&modules.root);
        if let Some(plugin) = &modules.plugin {
            layout.plugin = plugin.clone();
        }
        layout.controllers = modules.controllers.clone();
        layout.routers = modules.routers.clone();
        layout.endpoints = modules.endpoints.clone();
        layout.extensions = modules.extensions.clone();
        layout.settle = self.reload.settle;
        layout
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Graceful shutdown timeout (wait for in-flight requests)
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Max request body size (bytes)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Serve the `/__admin/` introspection routes
    #[serde(default = "default_true")]
    pub admin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout: default_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            max_body_size: default_max_body_size(),
            admin: true,
        }
    }
}

/// Module layout configuration
///
/// Relative paths are resolved against `root`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModulesConfig {
    /// Root directory
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Root plugin file; defaults to `bin/` plus the platform file name of `plugin`
    #[serde(default)]
    pub plugin: Option<PathBuf>,

    /// Controller modules directory
    #[serde(default = "default_controllers")]
    pub controllers: PathBuf,

    /// Router modules directory
    #[serde(default = "default_routers")]
    pub routers: PathBuf,

    /// Default endpoint modules directory
    #[serde(default = "default_endpoints")]
    pub endpoints: PathBuf,

    /// Recognized module file extensions
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory for shadow copies of loaded modules; defaults to the temp dir
    #[serde(default)]
    pub shadow_dir: Option<PathBuf>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            plugin: None,
            controllers: default_controllers(),
            routers: default_routers(),
            endpoints: default_endpoints(),
            extensions: default_extensions(),
            shadow_dir: None,
        }
    }
}

/// Reload scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReloadConfig {
    /// Poll for changes in the background
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Poll interval
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Minimum age of a changed file before it is loaded
    #[serde(default, with = "humantime_serde")]
    pub settle: Option<Duration>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: default_poll_interval(),
            settle: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 63090))
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_true() -> bool {
    true
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_controllers() -> PathBuf {
    PathBuf::from("controllers")
}

fn default_routers() -> PathBuf {
    PathBuf::from("routers")
}

fn default_endpoints() -> PathBuf {
    PathBuf::from("endpoints")
}

fn default_extensions() -> Vec<String> {
    vec![std::env::consts::DLL_EXTENSION.to_string()]
}

fn default_poll_interval() -> Duration {
    hydra_plugin_runtime::DEFAULT_POLL_INTERVAL
}

fn default_log_level() -> String {
    "info".to_string()
}
