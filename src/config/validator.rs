//! Configuration validation

use crate::config::Config;
use crate::error::{Result, TalonError, ValidationError};

/// Validates configuration values before use
pub struct ConfigValidator;

const SUPPORTED_ENGINES: &[&str] = &["docker", "podman"];

impl ConfigValidator {
    /// Validate the full configuration, collecting every failure
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        if !SUPPORTED_ENGINES.contains(&config.runtime.engine.as_str()) {
            errors.push(ValidationError::new(
                "runtime.engine",
                format!(
                    "unsupported engine '{}' (expected one of {:?})",
                    config.runtime.engine, SUPPORTED_ENGINES
                ),
            ));
        }

        if config.runtime.pull_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "runtime.pull_timeout_secs",
                "must be at least 1",
            ));
        }

        if config.runtime.launch_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "runtime.launch_timeout_secs",
                "must be at least 1",
            ));
        }

        if config.executor.workers == 0 {
            errors.push(ValidationError::new("executor.workers", "must be at least 1"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TalonError::ConfigValidation { errors })
        }
    }
}
