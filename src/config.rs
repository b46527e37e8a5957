use crate::ring::RingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming an extra configuration file
pub const CONFIG_PATH_ENV: &str = "TICK_RING_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ring scheduler configuration
    #[serde(default)]
    pub ring: RingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, the file named by
    /// `TICK_RING_CONFIG` and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/local".to_string());
        Self::load_from(config_path)
    }

    /// Load configuration with `path` as the override file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&path).required(false))
            // Override with environment variables (prefix: TICK_RING__)
            .add_source(
                config::Environment::with_prefix("TICK_RING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.ring.size, 60);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_embedded_defaults_match() {
        let config = Config::load_from("does/not/exist").unwrap();
        assert_eq!(config.ring.name, "ring");
        assert_eq!(config.ring.queue_buf, 64);
        assert_eq!(config.ring.register_max_wait_ms, 50);
        assert!(config.ring.retry);
        assert!(config.ring.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ring]\nname = \"billing\"\nsize = 120\nretry = false").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.ring.name, "billing");
        assert_eq!(config.ring.size, 120);
        assert!(!config.ring.retry);
        assert_eq!(config.ring.pool_limit, 256);
    }
}
