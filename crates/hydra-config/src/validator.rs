//! Configuration validation

use crate::Config;
use hydra_core::{Error, Result};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_modules(config)?;
    validate_reload(config)?;

    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    // Check request timeout is reasonable
    if config.server.request_timeout.is_zero() {
        return Err(Error::Config("request_timeout must be > 0".to_string()));
    }

    if config.server.request_timeout.as_secs() > 300 {
        tracing::warn!("request_timeout is very high (>5 minutes)");
    }

    // Check max body size
    if config.server.max_body_size == 0 {
        return Err(Error::Config("max_body_size must be > 0".to_string()));
    }

    Ok(())
}

fn validate_modules(config: &Config) -> Result<()> {
    let modules = &config.modules;

    for (name, dir) in [
        ("controllers", &modules.controllers),
        ("routers", &modules.routers),
        ("endpoints", &modules.endpoints),
    ] {
        if dir.as_os_str().is_empty() {
            return Err(Error::Config(format!("modules.{name} cannot be empty")));
        }
    }

    if let Some(plugin) = &modules.plugin {
        if plugin.as_os_str().is_empty() {
            return Err(Error::Config("modules.plugin cannot be empty".to_string()));
        }
    }

    if modules.extensions.is_empty() {
        return Err(Error::Config(
            "modules.extensions must list at least one extension".to_string(),
        ));
    }

    for ext in &modules.extensions {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(Error::Config(format!(
                "Invalid module extension '{ext}' (expected e.g. \"so\", without the dot)"
            )));
        }
    }

    if !modules.root.exists() {
        tracing::warn!(root = %modules.root.display(), "Module root does not exist yet");
    }

    Ok(())
}

fn validate_reload(config: &Config) -> Result<()> {
    if config.reload.poll_interval.is_zero() {
        return Err(Error::Config("reload.poll_interval must be > 0".to_string()));
    }

    if let Some(settle) = config.reload.settle {
        if settle > config.reload.poll_interval * 10 {
            tracing::warn!(
                settle = ?settle,
                poll_interval = ?config.reload.poll_interval,
                "reload.settle is much longer than the poll interval"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = Config::default();
        config.reload.poll_interval = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_body_limit() {
        let mut config = Config::default();
        config.server.max_body_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_directory() {
        let mut config = Config::default();
        config.modules.routers = PathBuf::new();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("modules.routers"));
    }

    #[test]
    fn test_extensions() {
        let mut config = Config::default();
        config.modules.extensions.clear();
        assert!(validate_config(&config).is_err());

        config.modules.extensions = vec![".so".to_string()];
        assert!(validate_config(&config).is_err());

        config.modules.extensions = vec!["so".to_string(), "dylib".to_string()];
        assert!(validate_config(&config).is_ok());
    }
}
