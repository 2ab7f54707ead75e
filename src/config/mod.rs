//! Configuration management for Talon
//!
//! Loads, validates, and saves the TOML configuration feeding the
//! container runtime, the executor worker pool, and the credential store.

use crate::error::{Result, TalonError};
use crate::tool::SecretStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta", default)]
    pub meta: MetaConfig,
    pub runtime: RuntimeConfig,
    pub executor: ExecutorConfig,
    /// Credential mapping handed to tool adapters; values are never logged
    #[serde(default)]
    pub secrets: HashMap<String, String>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: "1".to_string(),
            created_at: current_timestamp(),
        }
    }
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Container runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Container engine binary: "docker" or "podman"
    pub engine: String,
    /// Deadline for image pulls, in seconds
    pub pull_timeout_secs: u64,
    /// Default deadline for one tool launch, in seconds
    pub launch_timeout_secs: u64,
}

/// Worker pool configuration for concurrent tool dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Bounded worker count for dispatch within one execute
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig::default(),
            runtime: RuntimeConfig {
                engine: "docker".to_string(),
                pull_timeout_secs: 600,
                launch_timeout_secs: 300,
            },
            executor: ExecutorConfig { workers: 4 },
            secrets: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TalonError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TalonError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TalonError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        std::fs::write(path, content).map_err(|e| TalonError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Default config file location (~/.config/talon/config.toml)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("talon")
            .join("config.toml")
    }

    /// Apply environment variable overrides.
    ///
    /// `TALON_ENGINE` overrides the container engine; `TALON_<KEY>` (key
    /// uppercased) overrides or injects a secret.
    fn apply_env_overrides(&mut self) {
        if let Ok(engine) = std::env::var("TALON_ENGINE") {
            self.runtime.engine = engine;
        }
        for key in ["shodan_api_key"] {
            let var = format!("TALON_{}", key.to_uppercase());
            if let Ok(value) = std::env::var(&var) {
                self.secrets.insert(key.to_string(), value);
            }
        }
    }

    /// Credential store view over the configured secrets
    pub fn secret_store(&self) -> SecretStore {
        SecretStore::new(self.secrets.clone())
    }

    pub fn launch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.runtime.launch_timeout_secs)
    }

    pub fn pull_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.runtime.pull_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_validates() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.executor.workers = 8;
        config
            .secrets
            .insert("shodan_api_key".to_string(), "k".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.executor.workers, 8);
        assert_eq!(loaded.secrets.get("shodan_api_key").map(String::as_str), Some("k"));
    }

    #[test]
    fn test_missing_file_is_config_not_found() {
        let err = Config::load(Path::new("/nonexistent/talon.toml")).unwrap_err();
        assert!(matches!(err, TalonError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_secret_store_view() {
        let mut config = Config::default();
        config
            .secrets
            .insert("shodan_api_key".to_string(), "k".to_string());
        let store = config.secret_store();
        assert_eq!(store.get("shodan_api_key"), Some("k"));
    }
}
