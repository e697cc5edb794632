//! Plan document loading.

use std::fs;
use std::path::Path;

use thiserror::Error;

use planloom_core::types::Plan;

/// Plan loading errors.
#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported plan file extension: {0}")]
    UnsupportedExtension(String),
}

/// Serialization format of a plan document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Yaml,
}

impl PlanFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, PlanLoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(PlanLoadError::UnsupportedExtension(extension)),
        }
    }
}

/// Load a plan from a `.json`, `.yaml` or `.yml` file.
pub fn load_plan(path: &Path) -> Result<Plan, PlanLoadError> {
    let format = PlanFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_plan(&content, format)
}

pub fn parse_plan(content: &str, format: PlanFormat) -> Result<Plan, PlanLoadError> {
    let plan = match format {
        PlanFormat::Json => serde_json::from_str(content)?,
        PlanFormat::Yaml => serde_yaml::from_str(content)?,
    };
    Ok(plan)
}
