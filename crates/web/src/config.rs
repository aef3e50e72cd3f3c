//! Application configuration loaded from environment variables.
//!
//! The configuration is assembled once at startup and never mutated
//! afterwards. Plugins contribute their feature defaults while it is being
//! built (see [`crate::plugins::PluginRegistry::apply_defaults`]); explicit
//! environment variables win over plugin defaults.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FOODCOOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `FOODCOOP_HOST` - Bind address (default: 127.0.0.1)
//! - `FOODCOOP_PORT` - Listen port (default: 3000)
//! - `FOODCOOP_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `FOODCOOP_SCOPES` - Comma-separated foodcoop scopes, first is the default (default: f)
//! - `FOODCOOP_UPLOAD_DIR` - Where uploaded files are stored (default: uploads)
//! - `FOODCOOP_BANK_NAME` - Bank shown on the reference calculator
//! - `FOODCOOP_BANK_IBAN` - IBAN shown on the reference calculator
//! - `FOODCOOP_USE_BNN_UPLOAD` - Override the BNN upload feature flag
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use crate::plugins::PluginRegistry;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Foodcoop scopes served by this instance; never empty
    pub scopes: Vec<String>,
    /// Root directory for uploaded files
    pub upload_dir: PathBuf,
    /// Bank account members transfer money to
    pub bank: BankConfig,
    /// Optional features, switched on by plugins or the environment
    pub features: Features,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Bank account details shown on the reference calculator.
#[derive(Debug, Clone, Default)]
pub struct BankConfig {
    pub name: Option<String>,
    pub iban: Option<String>,
}

/// Feature flags.
///
/// Every flag defaults to off; plugins switch on what they provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// Members may upload BNN article files.
    pub use_bnn_upload: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env(plugins: &PluginRegistry) -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(plugins, |key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(
        plugins: &PluginRegistry,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = env.database_url("FOODCOOP_DATABASE_URL")?;
        let host = env
            .or_default("FOODCOOP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FOODCOOP_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("FOODCOOP_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("FOODCOOP_PORT".to_string(), e.to_string()))?;
        let base_url = env.or_default("FOODCOOP_BASE_URL", "http://localhost:3000");
        let scopes = parse_scopes(&env.or_default("FOODCOOP_SCOPES", "f"))?;
        let upload_dir = PathBuf::from(env.or_default("FOODCOOP_UPLOAD_DIR", "uploads"));

        let bank = BankConfig {
            name: env.optional("FOODCOOP_BANK_NAME"),
            iban: env.optional("FOODCOOP_BANK_IBAN"),
        };

        let mut features = Features::default();
        plugins.apply_defaults(&mut features);
        if let Some(value) = env.optional("FOODCOOP_USE_BNN_UPLOAD") {
            features.use_bnn_upload = parse_flag("FOODCOOP_USE_BNN_UPLOAD", &value)?;
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            scopes,
            upload_dir,
            bank,
            features,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The scope used when none is given, e.g. by the CLI.
    #[must_use]
    pub fn default_scope(&self) -> &str {
        self.scopes.first().map_or("f", String::as_str)
    }

    /// Whether `scope` is served by this instance.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}

/// Parse the comma-separated scope list.
fn parse_scopes(raw: &str) -> Result<Vec<String>, ConfigError> {
    let scopes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if scopes.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "FOODCOOP_SCOPES".to_string(),
            "at least one scope is required".to_string(),
        ));
    }

    if let Some(bad) = scopes.iter().find(|s| {
        !s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    }) {
        return Err(ConfigError::InvalidEnvVar(
            "FOODCOOP_SCOPES".to_string(),
            format!("'{bad}' may only contain a-z, 0-9, '_' and '-'"),
        ));
    }

    Ok(scopes)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::plugins::BnnUploadPlugin;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(
            &PluginRegistry::new(),
            lookup(&[("FOODCOOP_DATABASE_URL", "postgres://localhost/foodcoop")]),
        )
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.scopes, vec!["f".to_string()]);
        assert_eq!(config.default_scope(), "f");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(!config.features.use_bnn_upload);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_database_url_fallback() {
        let result = AppConfig::from_lookup(
            &PluginRegistry::new(),
            lookup(&[("DATABASE_URL", "postgres://fly/foodcoop")]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(&PluginRegistry::new(), lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "FOODCOOP_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(
            &PluginRegistry::new(),
            lookup(&[
                ("FOODCOOP_DATABASE_URL", "postgres://localhost/foodcoop"),
                ("FOODCOOP_PORT", "eighty"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "FOODCOOP_PORT"));
    }

    #[test]
    fn test_scopes_are_trimmed_and_validated() {
        assert_eq!(
            parse_scopes(" f, demo ,,").unwrap(),
            vec!["f".to_string(), "demo".to_string()]
        );
        assert!(parse_scopes(" , ").is_err());
        assert!(parse_scopes("f,Demo Coop").is_err());
    }

    #[test]
    fn test_plugin_default_enables_feature() {
        let plugins = PluginRegistry::new().with(BnnUploadPlugin);
        let config = AppConfig::from_lookup(
            &plugins,
            lookup(&[("FOODCOOP_DATABASE_URL", "postgres://localhost/foodcoop")]),
        )
        .unwrap();
        assert!(config.features.use_bnn_upload);
    }

    #[test]
    fn test_environment_overrides_plugin_default() {
        let plugins = PluginRegistry::new().with(BnnUploadPlugin);
        let config = AppConfig::from_lookup(
            &plugins,
            lookup(&[
                ("FOODCOOP_DATABASE_URL", "postgres://localhost/foodcoop"),
                ("FOODCOOP_USE_BNN_UPLOAD", "off"),
            ]),
        )
        .unwrap();
        assert!(!config.features.use_bnn_upload);
    }

    #[test]
    fn test_invalid_flag() {
        assert!(parse_flag("X", "maybe").is_err());
        assert!(parse_flag("X", "YES").unwrap());
    }
}
