//! Tracing/logging initialization.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, with timestamps and without targets.
    #[default]
    Json,
    /// Single-line human-readable output for local development.
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "info".to_string(),
        }
    }
}

impl TracingConfig {
    /// `RUST_LOG` wins over the configured directives; invalid directives
    /// fall back to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &TracingConfig) {
    let filter = config.env_filter();

    let _ = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .with_target(false)
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: TracingConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg, TracingConfig::default());

        let cfg: TracingConfig =
            serde_json::from_value(serde_json::json!({ "format": "compact" })).unwrap();
        assert_eq!(cfg.format, LogFormat::Compact);
        assert_eq!(cfg.filter, "info");
    }

    #[test]
    fn init_twice_is_a_noop() {
        let cfg = TracingConfig {
            format: LogFormat::Compact,
            filter: "warn".to_string(),
        };
        init(&cfg);
        init(&cfg);
    }
}
