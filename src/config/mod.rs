//! Configuration management for grabbox
//!
//! Layered configuration loaded from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file (default `config/grabbox.toml`, override via
//!    the `GRABBOX_CONFIG` environment variable)
//! 3. Environment variables (highest priority), pattern
//!    `GRABBOX_<section>__<key>`, e.g.
//!    `GRABBOX_DOWNLOADS__MAX_CONCURRENT=4` or
//!    `GRABBOX_SERVER__BIND_ADDR=0.0.0.0:9000`

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, DownloadsConfig, EventsConfig, ResolverConfig, ServerConfig, StoreConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path. Useful for testing.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn resolve_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resolver.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[downloads]
max_concurrent = 3
        "#,
        )
        .unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.downloads.max_concurrent, 3);
    }

    #[test]
    fn full_config_parses_from_toml() {
        let config: Config = toml::from_str(
            r#"
[server]
bind_addr = "127.0.0.1:9090"
max_request_bytes = "2MB"

[store]
path = "/var/lib/grabbox/jobs"

[resolver]
endpoint = "http://resolver.internal:3000/"
timeout_secs = 15

[downloads]
max_concurrent = 4
download_dir = "/var/lib/grabbox/downloads"
library_dir = "/var/lib/grabbox/library"

[events]
capacity = 512
        "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_addr.port(), 9090);
        assert_eq!(config.server.max_request_bytes.as_u64(), 2 * 1024 * 1024);
        assert_eq!(config.resolver.timeout_secs, 15);
        assert_eq!(config.downloads.max_concurrent, 4);
        assert_eq!(config.events.capacity, 512);
    }

    #[test]
    fn validation_catches_bad_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[downloads]
max_concurrent = 0
        "#,
        )
        .unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Validation(ValidationError::ZeroConcurrency)
        ));
    }
}
