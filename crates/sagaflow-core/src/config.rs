//! Workflow configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::NOT_CONFIGURED_FOR_BUILD;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables shared by every workflow run.
///
/// ```json
/// { "not_configured_error_code": "app_not_configured_for_build",
///   "compensation_timeout_ms": 10000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Error code that marks "branch listing on an app without build setup".
    /// Such an error is treated as an empty branch list during transfer.
    pub not_configured_error_code: String,

    /// Upper bound for a single compensating call. Unset means wait forever.
    pub compensation_timeout_ms: Option<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            not_configured_error_code: NOT_CONFIGURED_FOR_BUILD.to_string(),
            compensation_timeout_ms: None,
        }
    }
}

impl WorkflowConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.not_configured_error_code.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "not_configured_error_code must not be empty".to_string(),
            ));
        }
        if self.compensation_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "compensation_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn compensation_timeout(&self) -> Option<Duration> {
        self.compensation_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = WorkflowConfig::from_json_str("{}").unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert!(config.compensation_timeout().is_none());
    }

    #[test]
    fn timeout_is_read_in_millis() {
        let config = WorkflowConfig::from_json_str(r#"{"compensation_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.compensation_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = WorkflowConfig::from_json_str(r#"{"compensation_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = WorkflowConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
