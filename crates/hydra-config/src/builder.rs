//! Configuration builder

use crate::types::{Config, LogFormat};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Builder for constructing configuration programmatically
///
/// Starts from [`Config::default`]; [`ConfigBuilder::build`] validates.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.config.server.listen = addr;
        self
    }

    /// Set max request body size
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.config.server.max_body_size = bytes;
        self
    }

    /// Enable or disable the admin routes
    pub fn admin(mut self, enabled: bool) -> Self {
        self.config.server.admin = enabled;
        self
    }

    /// Set module root directory
    pub fn module_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.modules.root = root.into();
        self
    }

    /// Set recognized module extensions
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.modules.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set reload poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.reload.poll_interval = interval;
        self
    }

    /// Set settle window
    pub fn settle(mut self, settle: Duration) -> Self {
        self.config.reload.settle = Some(settle);
        self
    }

    /// Enable or disable background reloading
    pub fn reload(mut self, enabled: bool) -> Self {
        self.config.reload.enabled = enabled;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Set log format
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Build the configuration
    pub fn build(self) -> hydra_core::Result<Config> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();

        let config = ConfigBuilder::new()
            .listen(addr)
            .module_root("/srv/hydra")
            .poll_interval(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(config.server.listen, addr);
        assert_eq!(config.modules.root, PathBuf::from("/srv/hydra"));
        assert_eq!(config.reload.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_builder_rejects_invalid() {
        let result = ConfigBuilder::new().poll_interval(Duration::ZERO).build();
        assert!(result.is_err());
    }
}
