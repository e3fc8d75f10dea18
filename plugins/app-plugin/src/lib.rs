//! Root plugin module
//!
//! Built as `bin/libplugin.so` (platform naming applies). Replacing this file
//! makes the host rebuild the whole module tree.

use hydra_plugin_api::prelude::*;

/// The application root
#[derive(Debug, Default)]
pub struct ApplicationManager;

impl PluginDescriptor for ApplicationManager {
    fn name(&self) -> &str {
        "application-manager"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Hosts the time and web controllers"
    }
}

hydra_plugin_api::export_plugin!(ApplicationManager);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata() {
        let metadata = createPlugin().metadata();
        assert_eq!(metadata.name, "application-manager");
        assert_eq!(metadata.version, env!("CARGO_PKG_VERSION"));
    }
}
