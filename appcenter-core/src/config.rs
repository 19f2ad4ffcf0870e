// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Plugin loader configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration for the plugin loader.
///
/// # Example TOML Configuration
///
/// ```toml
/// blocklist = ["dummy"]
/// max_background_jobs = 2
/// job_timeout_ms = 30000
/// provenance_origins = ["fedora", "updates"]
/// catalog_path = "/usr/share/appcenter/catalog.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// If non-empty, only these plugins stay enabled.
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Plugins disabled at setup.
    #[serde(default)]
    pub blocklist: Vec<String>,

    /// Maximum number of concurrent non-interactive jobs.
    #[serde(default = "default_max_background_jobs")]
    pub max_background_jobs: usize,

    /// Timeout applied to jobs that do not set their own.
    #[serde(default)]
    pub job_timeout_ms: Option<u64>,

    /// Where localized remote resources are stored.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Origins considered to be provided by the distribution.
    #[serde(default)]
    pub provenance_origins: Vec<String>,

    /// Catalog file for the catalog plugin.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_max_background_jobs() -> usize {
    4
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("appcenter").join("cache")
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            allowlist: Vec::new(),
            blocklist: Vec::new(),
            max_background_jobs: default_max_background_jobs(),
            job_timeout_ms: None,
            cache_dir: default_cache_dir(),
            provenance_origins: Vec::new(),
            catalog_path: None,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load a configuration file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            Some("toml") => Self::from_toml(&contents),
            other => Err(ConfigError::UnknownFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Build a configuration from `APPCENTER_*` environment variables.
    ///
    /// List values are comma separated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix("APPCENTER_") else {
                continue;
            };
            match name {
                "ALLOWLIST" => config.allowlist = split_list(&value),
                "BLOCKLIST" => config.blocklist = split_list(&value),
                "MAX_BACKGROUND_JOBS" => {
                    config.max_background_jobs =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            key,
                            value: value.clone(),
                        })?
                }
                "JOB_TIMEOUT_MS" => {
                    config.job_timeout_ms =
                        Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                            key,
                            value: value.clone(),
                        })?)
                }
                "CACHE_DIR" => config.cache_dir = PathBuf::from(value),
                "PROVENANCE_ORIGINS" => config.provenance_origins = split_list(&value),
                "CATALOG_PATH" => config.catalog_path = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        Ok(config)
    }

    /// Get the default job timeout as a Duration.
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_ms.map(Duration::from_millis)
    }

    /// Check whether a plugin passes the allow and block lists.
    pub fn is_plugin_allowed(&self, name: &str) -> bool {
        if self.blocklist.iter().any(|n| n == name) {
            return false;
        }
        self.allowlist.is_empty() || self.allowlist.iter().any(|n| n == name)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_background_jobs == 0 {
            return Err(ConfigError::Invalid(
                "max_background_jobs must be at least 1".to_string(),
            ));
        }
        if let Some(name) = self.allowlist.iter().find(|n| self.blocklist.contains(n)) {
            return Err(ConfigError::Invalid(format!(
                "plugin {} is both allowed and blocked",
                name
            )));
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cannot read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Unknown configuration format: {0:?}")]
    UnknownFormat(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::from_toml("").unwrap();
        assert_eq!(config.max_background_jobs, 4);
        assert!(config.job_timeout().is_none());
        assert!(config.cache_dir.ends_with("appcenter/cache"));
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn test_from_json() {
        let config = LoaderConfig::from_json(
            r#"{"blocklist": ["dummy"], "job_timeout_ms": 250, "provenance_origins": ["fedora"]}"#,
        )
        .unwrap();
        assert_eq!(config.blocklist, vec!["dummy"]);
        assert_eq!(config.job_timeout(), Some(Duration::from_millis(250)));
        assert!(!config.is_plugin_allowed("dummy"));
        assert!(config.is_plugin_allowed("catalog"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "allowlist = [\"catalog\"]\nmax_background_jobs = 2").unwrap();

        let config = LoaderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_background_jobs, 2);
        assert!(config.is_plugin_allowed("catalog"));
        assert!(!config.is_plugin_allowed("dummy"));

        let other = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            LoaderConfig::from_file(other.path()),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_from_vars() {
        let vars = vec![
            ("APPCENTER_BLOCKLIST".to_string(), "dummy, provenance".to_string()),
            ("APPCENTER_JOB_TIMEOUT_MS".to_string(), "100".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let config = LoaderConfig::from_vars(vars).unwrap();
        assert_eq!(config.blocklist, vec!["dummy", "provenance"]);
        assert_eq!(config.job_timeout_ms, Some(100));

        let bad = vec![("APPCENTER_MAX_BACKGROUND_JOBS".to_string(), "many".to_string())];
        assert!(matches!(
            LoaderConfig::from_vars(bad),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = LoaderConfig::default();
        assert!(config.validate().is_ok());

        config.max_background_jobs = 0;
        assert!(config.validate().is_err());

        config.max_background_jobs = 1;
        config.allowlist = vec!["dummy".to_string()];
        config.blocklist = vec!["dummy".to_string()];
        assert!(config.validate().is_err());
    }
}
