//! Application configuration.
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Environment variables (`STOCKBOOK_*`, nested keys separated by `__`,
//!    e.g. `STOCKBOOK_TRACING__FORMAT=compact`)

use config::{Config, ConfigBuilder, ConfigError, Environment, builder::DefaultState};
use serde::Deserialize;
use thiserror::Error;

use stockbook_observability::TracingConfig;

const ENV_PREFIX: &str = "STOCKBOOK";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: i64 = 10;
const DEFAULT_HISTORY_PAGE_SIZE: i64 = 50;

/// Which `LedgerStore` backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub store: StoreKind,
    #[serde(default)]
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub history_page_size: usize,
    #[serde(default)]
    pub tracing: TracingConfig,
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load from defaults and the process environment, then validate.
    pub fn load() -> Result<Self, AppConfigError> {
        let config = Self::builder()?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Self::from_config(config)
    }

    /// Builder preloaded with every default; callers layer sources on top.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, AppConfigError> {
        Ok(Config::builder()
            .set_default("listen_addr", DEFAULT_LISTEN_ADDR)?
            .set_default("store", "memory")?
            .set_default("db_max_connections", DEFAULT_DB_MAX_CONNECTIONS)?
            .set_default("history_page_size", DEFAULT_HISTORY_PAGE_SIZE)?
            .set_default("tracing.format", "json")?
            .set_default("tracing.filter", "info")?)
    }

    pub fn from_config(config: Config) -> Result<Self, AppConfigError> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), AppConfigError> {
        if self.history_page_size == 0 {
            return Err(AppConfigError::Invalid(
                "history_page_size must be greater than zero".to_string(),
            ));
        }
        if self.store == StoreKind::Postgres
            && self.database_url.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return Err(AppConfigError::Invalid(
                "database_url is required when store = postgres".to_string(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(AppConfigError::Invalid(
                "db_max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_observability::LogFormat;

    fn load_with(overrides: &[(&str, &str)]) -> Result<AppConfig, AppConfigError> {
        let mut builder = AppConfig::builder()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        AppConfig::from_config(builder.build()?)
    }

    #[test]
    fn defaults_are_complete_and_valid() {
        let cfg = load_with(&[]).unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.store, StoreKind::Memory);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.history_page_size, 50);
        assert_eq!(cfg.tracing.format, LogFormat::Json);
        assert_eq!(cfg.tracing.filter, "info");
    }

    #[test]
    fn overrides_replace_defaults() {
        let cfg = load_with(&[
            ("store", "postgres"),
            ("database_url", "postgres://localhost/stockbook"),
            ("history_page_size", "20"),
            ("tracing.format", "compact"),
        ])
        .unwrap();
        assert_eq!(cfg.store, StoreKind::Postgres);
        assert_eq!(cfg.history_page_size, 20);
        assert_eq!(cfg.tracing.format, LogFormat::Compact);
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let err = load_with(&[("store", "postgres")]).unwrap_err();
        assert!(matches!(err, AppConfigError::Invalid(msg) if msg.contains("database_url")));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = load_with(&[("history_page_size", "0")]).unwrap_err();
        assert!(matches!(err, AppConfigError::Invalid(msg) if msg.contains("history_page_size")));
    }

    #[test]
    fn unknown_store_fails_to_load() {
        let err = load_with(&[("store", "sqlite")]).unwrap_err();
        assert!(matches!(err, AppConfigError::Load(_)));
    }
}
