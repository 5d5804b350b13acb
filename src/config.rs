//! Application configuration.
//!
//! [`AppConfig::load`] reads `config/config.toml` (optional) and then
//! environment variables prefixed with `STOCKROOM`, using `__` to separate
//! nested keys: `STOCKROOM__DATABASE__URL`, `STOCKROOM__SERVER__BIND`,
//! `STOCKROOM__VALIDATION__SUPPLIER_NAME_MIN_LEN`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub use crate::pool::config::*;
pub use crate::validation::ValidationRules;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
const ENV_PREFIX: &str = "STOCKROOM";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub validation: ValidationRules,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Worker threads for the `may` scheduler.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Coroutine stack size in bytes.
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            workers: default_workers(),
            stack_size: default_stack_size(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_stack_size() -> usize {
    0x8000
}

impl AppConfig {
    /// Load from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from the given TOML file (if it exists) layered under env vars.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An unreadable file is reported and skipped; env vars still apply.
                if path.exists() {
                    log::warn!(
                        "failed to load config file {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings.try_deserialize::<AppConfig>().map_err(|e| {
            ConfigError::Message(format!("Configuration could not be deserialized: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = AppConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(cfg.server.workers, 4);
        assert_eq!(cfg.database.max_connections, 10);
        assert!(cfg.database.migrate_on_startup);
        assert_eq!(cfg.validation.supplier_name_min_len, 3);
    }

    #[test]
    fn test_memory_url_detection() {
        let db = DatabaseConfig {
            url: MEMORY_URL.to_string(),
            ..DatabaseConfig::default()
        };
        assert!(db.is_memory());
        assert!(!DatabaseConfig::default().is_memory());
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let settings = Config::builder()
            .add_source(File::from_str(
                r#"
                [server]
                bind = "127.0.0.1:8080"

                [validation]
                supplier_name_min_len = 5
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg: AppConfig = settings.try_deserialize().unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.server.workers, 4);
        assert_eq!(cfg.validation.supplier_name_min_len, 5);
        assert_eq!(cfg.database.url, DatabaseConfig::default().url);
    }
}
