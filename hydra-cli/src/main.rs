//! Hydra CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hydra_config::{load_config, Config, LogFormat};
use hydra_plugin_runtime::{ModuleLoader, NativeOpener, PluginManager, SHADOW_CLEANUP_GRACE};
use hydra_runtime::{ServerBuilder, SignalHandler};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hydra")]
#[command(about = "Hot-reloading native plugin host", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the module tree and serve it over HTTP
    Serve {
        /// Path to configuration file; built-in defaults when omitted
        #[arg(short, long, env = "HYDRA_CONFIG")]
        config: Option<PathBuf>,

        /// Override the listen address
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Override the module root directory
        #[arg(long)]
        root: Option<PathBuf>,

        /// Override the log level (trace, debug, info, warn, error)
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, env = "HYDRA_CONFIG")]
        config: PathBuf,
    },

    /// Load the module tree once and print every reachable route
    Routes {
        /// Path to configuration file; built-in defaults when omitted
        #[arg(short, long, env = "HYDRA_CONFIG")]
        config: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            root,
            log_level,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if let Some(root) = root {
                config.modules.root = root;
            }
            if let Some(level) = log_level {
                config.logging.level = level;
            }

            init_tracing(&config.logging.level, config.logging.format)?;

            tracing::info!(
                listen = %config.server.listen,
                root = %config.modules.root.display(),
                reload = config.reload.enabled,
                "Starting Hydra"
            );

            let server = ServerBuilder::new().config(config).build()?;

            // A missing root plugin is not fatal; requests get 503 until it appears.
            let manager = Arc::clone(server.manager());
            match tokio::task::spawn_blocking(move || manager.load()).await? {
                Ok(generation) => tracing::info!(generation, "Module tree loaded"),
                Err(e) => tracing::error!(error = %e, "Initial load failed"),
            }

            let shutdown_signal = server.shutdown_signal();
            tokio::spawn(async move {
                let handler = SignalHandler::new(shutdown_signal);
                handler.run().await;
            });

            server.run().await?;

            tracing::info!("Server stopped");
            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(Some(&config)) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Listen: {}", cfg.server.listen);
                    tracing::info!("  Module root: {}", cfg.modules.root.display());
                    tracing::info!("  Plugin: {}", cfg.to_layout().plugin_path().display());
                    tracing::info!(
                        "  Hot reload: {} (every {:?})",
                        cfg.reload.enabled,
                        cfg.reload.poll_interval
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Routes { config, json } => {
            let config = load_config(config.as_ref())?;
            init_tracing("warn", config.logging.format)?;
            print_routes(&config, json)
        }

        Commands::Version => {
            println!("Hydra");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn print_routes(config: &Config, json: bool) -> Result<()> {
    let opener = match &config.modules.shadow_dir {
        Some(dir) => NativeOpener::with_shadow_dir(dir),
        None => NativeOpener::new(),
    };
    opener.cleanup_stale_shadows(SHADOW_CLEANUP_GRACE);
    let manager = PluginManager::new(ModuleLoader::new(Arc::new(opener)), config.to_layout());
    manager
        .load()
        .with_context(|| format!("Failed to load {}", config.to_layout().plugin_path().display()))?;

    let routes = manager.list_routes();
    if json {
        println!("{}", serde_json::to_string_pretty(&routes)?);
        return Ok(());
    }

    if routes.is_empty() {
        println!("No routes");
        return Ok(());
    }
    for route in routes {
        if route.description.is_empty() {
            println!("{:<7} {}", route.method, route.path);
        } else {
            println!("{:<7} {:<24} {}", route.method, route.path, route.description);
        }
    }
    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {level}"))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_level(true))
            .init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }

    Ok(())
}
