//! Optional features that extend the dashboard.
//!
//! Plugins are registered explicitly when the application is assembled:
//!
//! ```rust,ignore
//! let plugins = PluginRegistry::new().with(BnnUploadPlugin);
//! let config = AppConfig::from_env(&plugins)?;
//! plugins.prepare_all(&config)?;
//! let app = app::router(state, &plugins);
//! ```
//!
//! A plugin contributes feature defaults while the configuration is built,
//! gets one chance to prepare resources once it is frozen, and may add
//! routes below `/{foodcoop}`.

mod bnn_upload;

pub use bnn_upload::BnnUploadPlugin;

use axum::Router;
use thiserror::Error;

use crate::config::{AppConfig, Features};
use crate::state::AppState;

/// Errors raised while preparing a plugin. Fatal at startup.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {plugin}: {source}")]
    Io {
        plugin: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("plugin {plugin}: {reason}")]
    Invalid {
        plugin: &'static str,
        reason: String,
    },
}

/// An optional feature.
pub trait Plugin: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Switch on the features this plugin provides.
    fn default_config(&self, _features: &mut Features) {}

    /// Prepare resources against the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns `PluginError` if the plugin cannot run.
    fn prepare(&self, _config: &AppConfig) -> Result<(), PluginError> {
        Ok(())
    }

    /// Routes relative to the foodcoop scope.
    fn routes(&self) -> Router<AppState> {
        Router::new()
    }
}

/// The plugins of this application, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin.
    #[must_use]
    pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Names of the registered plugins.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name())
    }

    /// Let every plugin write its defaults into `features`.
    pub fn apply_defaults(&self, features: &mut Features) {
        for plugin in &self.plugins {
            plugin.default_config(features);
        }
    }

    /// Prepare every plugin, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first `PluginError`.
    pub fn prepare_all(&self, config: &AppConfig) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.prepare(config)?;
            tracing::info!(plugin = plugin.name(), "Plugin ready");
        }
        Ok(())
    }

    /// All plugin routes merged into one router.
    #[must_use]
    pub fn routes(&self) -> Router<AppState> {
        self.plugins
            .iter()
            .fold(Router::new(), |router, plugin| router.merge(plugin.routes()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &'static str {
            self.0
        }
    }

    struct Broken;

    impl Plugin for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn prepare(&self, _config: &AppConfig) -> Result<(), PluginError> {
            Err(PluginError::Invalid {
                plugin: self.name(),
                reason: "nope".to_string(),
            })
        }
    }

    #[test]
    fn test_registration_order() {
        let registry = PluginRegistry::new()
            .with(Named("first"))
            .with(BnnUploadPlugin)
            .with(Named("last"));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["first", "bnn_upload", "last"]
        );
    }

    #[test]
    fn test_defaults_without_plugins() {
        let mut features = Features::default();
        PluginRegistry::new().apply_defaults(&mut features);
        assert_eq!(features, Features::default());

        PluginRegistry::new()
            .with(BnnUploadPlugin)
            .apply_defaults(&mut features);
        assert!(features.use_bnn_upload);
    }

    #[test]
    fn test_prepare_stops_at_failure() {
        let config = AppConfig::from_lookup(&PluginRegistry::new(), |key| {
            (key == "FOODCOOP_DATABASE_URL").then(|| "postgres://localhost/foodcoop".to_string())
        })
        .unwrap();

        let registry = PluginRegistry::new().with(Named("ok")).with(Broken);
        let err = registry.prepare_all(&config).unwrap_err();
        assert_eq!(err.to_string(), "plugin broken: nope");
    }
}
