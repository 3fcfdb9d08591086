//! Application configuration.
//!
//! Loaded from an optional JSON file, then overridden from the environment.
//! Every field has a default so an empty `{}` is a valid file.

use std::fs;
use std::path::{Path, PathBuf};

use gramin_health_llm::FormatterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::TwilioConfig;
use crate::triage::ArtifactPaths;
use crate::vitals::AlertThresholds;

pub const DEFAULT_LOG_FILTER: &str = "gramin_health_core=info,gramin_health_llm=info";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub artifacts: ArtifactPaths,
    pub formatter: FormatterConfig,
    pub alerts: TwilioConfig,
    pub thresholds: AlertThresholds,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("health.db"),
            artifacts: ArtifactPaths::default(),
            formatter: FormatterConfig::default(),
            alerts: TwilioConfig::default(),
            thresholds: AlertThresholds::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// File (when given) plus environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable source. Blank values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GRAMIN_DB_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("GRAMIN_CLASSIFIER_PATH") {
            self.artifacts.classifier_path = PathBuf::from(v);
        }
        if let Some(v) = get("GRAMIN_TREATMENTS_PATH") {
            self.artifacts.treatments_path = PathBuf::from(v);
        }
        if let Some(v) = get("OPENROUTER_API_KEY") {
            self.formatter.api_key = Some(v);
        }
        if let Some(v) = get("OPENROUTER_URL") {
            self.formatter.endpoint = v;
        }
        if let Some(v) = get("OPENROUTER_MODEL") {
            self.formatter.model = v;
        }
        if let Some(v) = get("TWILIO_ACCOUNT_SID") {
            self.alerts.account_sid = Some(v);
        }
        if let Some(v) = get("TWILIO_AUTH_TOKEN") {
            self.alerts.auth_token = Some(v);
        }
        if let Some(v) = get("TWILIO_PHONE_NUMBER") {
            self.alerts.from_number = Some(v);
        }
        if let Some(v) = get("HEALTH_WORKER_PHONE") {
            self.alerts.health_worker_phone = Some(v);
        }
    }
}
