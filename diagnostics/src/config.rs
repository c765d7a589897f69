//! Runtime configuration for the diagnostics CLI.
//!
//! Values come from an optional TOML file, then environment overrides:
//!
//! ```toml
//! access_token = "optional user JWT for the session check"
//!
//! [backend]
//! base_url = "https://project.example.co"
//! anon_key = "public-anon-key"
//! timeout_secs = 10
//!
//! [thresholds]
//! slow_response_ms = 1000
//! slow_query_ms = 500
//! ```

use crate::checks::CheckThresholds;
use backend::BackendConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_BACKEND_URL: &str = "PETCOACH_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "PETCOACH_ANON_KEY";
pub const ENV_ACCESS_TOKEN: &str = "PETCOACH_ACCESS_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub base_url: String,
    pub anon_key: String,
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        let defaults = BackendConfig::default();
        Self {
            base_url: defaults.base_url,
            anon_key: defaults.anon_key,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub access_token: Option<String>,
    pub backend: BackendSection,
    pub thresholds: CheckThresholds,
}

impl DiagnosticsConfig {
    /// Load from `path` (defaults when `None`), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading diagnostics config from {}", path.display());
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            debug!("Backend URL overridden by {}", ENV_BACKEND_URL);
            self.backend.base_url = url;
        }
        if let Ok(key) = std::env::var(ENV_ANON_KEY) {
            debug!("Anon key overridden by {}", ENV_ANON_KEY);
            self.backend.anon_key = key;
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token).filter(|t| !t.is_empty());
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new()
            .with_base_url(self.backend.base_url.clone())
            .with_anon_key(self.backend.anon_key.clone())
            .with_timeout(Duration::from_secs(self.backend.timeout_secs))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.backend_config()
            .validate()
            .and_then(|_| self.thresholds.validate())
            .map_err(|message| ConfigError::Invalid { message })
    }
}
