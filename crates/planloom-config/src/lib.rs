//! # Planloom Config
//!
//! Unified single-file configuration for Planloom.
//! A single `planloom.yaml` configures the executor, the enabled plugins and
//! observability settings. Every field has a default, so an empty file is a
//! valid configuration.

mod loader;

pub use loader::{load_config, parse_config, ConfigError};

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration schema for Planloom.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanloomConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for PlanloomConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            executor: ExecutorConfig::default(),
            observability: ObservabilityConfig::default(),
            plugins: PluginsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Attached to the startup log line.
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_env(),
        }
    }
}

fn default_app_name() -> String {
    "planloom".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Per-invocation timeout. Unset means calls may suspend indefinitely.
    #[serde(default)]
    pub invocation_timeout_ms: Option<u64>,
    /// Cap on rendered values in trace output.
    #[serde(default = "default_max_trace_value_chars")]
    pub max_trace_value_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            invocation_timeout_ms: None,
            max_trace_value_chars: default_max_trace_value_chars(),
        }
    }
}

impl ExecutorConfig {
    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.invocation_timeout_ms.map(Duration::from_millis)
    }
}

fn default_max_trace_value_chars() -> usize {
    2_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit span open/close events.
    #[serde(default)]
    pub traces_enabled: bool,
    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            traces_enabled: false,
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in plugin selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginsConfig {
    /// Plugin names to register. Empty enables every built-in plugin.
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl PluginsConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|enabled| enabled == name)
    }
}
