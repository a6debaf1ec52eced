//! Engine configuration loaded from TOML
//!
//! Every section is optional:
//!
//! ```toml
//! [thresholds]
//! min_sample_size = 20
//!
//! [advisory]
//! ttl_secs = 600
//! max_attempts = 3
//!
//! [provider]
//! type = "chat_completions"
//! base_url = "http://localhost:8080/v1"
//! model = "qwen2.5"
//! ```
//!
//! The provider API key may be left out and supplied through the
//! `QORCOMPARE_API_KEY` environment variable instead.

use crate::advisory::{AdvisoryConfig, ProviderConfig};
use crate::anomaly::ClassifierThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {section} config: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ClassifierThresholds,
    pub advisory: AdvisoryConfig,
    /// Advisory backend; advisories fall back to the built-in report when absent
    pub provider: Option<ProviderConfig>,
}

impl EngineConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds
            .validate()
            .map_err(|message| ConfigError::Invalid {
                section: "thresholds",
                message,
            })?;
        self.advisory
            .validate()
            .map_err(|message| ConfigError::Invalid {
                section: "advisory",
                message,
            })?;
        Ok(())
    }
}
