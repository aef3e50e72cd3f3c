//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{AppConfig, Features};
use crate::db::Store;

/// Application state shared across all handlers.
///
/// Cheaply cloneable; the configuration inside is frozen for the lifetime
/// of the process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn Store>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Dashboard configuration, with plugin defaults applied
    /// * `store` - Persistence backend
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Feature flags.
    #[must_use]
    pub fn features(&self) -> Features {
        self.inner.config.features
    }
}
