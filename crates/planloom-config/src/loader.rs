//! Configuration loading.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::PlanloomConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load full Planloom configuration from YAML file.
pub fn load_config(path: &Path) -> Result<PlanloomConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Parse and validate configuration from YAML text.
pub fn parse_config(content: &str) -> Result<PlanloomConfig, ConfigError> {
    // An empty document deserializes as unit, not as an empty mapping.
    let config: PlanloomConfig = if content.trim().is_empty() {
        PlanloomConfig::default()
    } else {
        serde_yaml::from_str(content)?
    };
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &PlanloomConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.executor.invocation_timeout_ms == Some(0) {
        return Err(ConfigError::Invalid(
            "executor.invocation_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.executor.max_trace_value_chars == 0 {
        return Err(ConfigError::Invalid(
            "executor.max_trace_value_chars must be > 0".to_string(),
        ));
    }

    validate_plugins(config)?;
    Ok(())
}

fn validate_plugins(config: &PlanloomConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in &config.plugins.enabled {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "plugins.enabled[] must not be empty".to_string(),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "plugins.enabled lists '{}' more than once",
                name
            )));
        }
    }
    Ok(())
}
