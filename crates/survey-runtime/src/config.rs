//! Runtime configuration read from a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use survey_spec::GeoFix;

pub const DEFAULT_CONTEXT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_OUTPUT: &str = "submissions.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Catalog JSON to run instead of the bundled questionnaire.
    pub catalog: Option<PathBuf>,
    /// JSON-lines file receiving submissions.
    pub output: PathBuf,
    /// Overrides the catalog's sheet name.
    pub sheet_name: Option<String>,
    pub device_id_path: Option<PathBuf>,
    pub context_timeout_ms: u64,
    /// Fixed position reported for every session. Without it no position is captured.
    pub position: Option<GeoFix>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            sheet_name: None,
            device_id_path: None,
            context_timeout_ms: DEFAULT_CONTEXT_TIMEOUT_MS,
            position: None,
        }
    }
}

impl RuntimeConfig {
    /// `config.json` under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "wli", "fellowship-survey")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads `path` when given, else the default location. A missing default file
    /// or an empty file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    pub fn context_timeout(&self) -> Duration {
        Duration::from_millis(self.context_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_means_defaults() {
        assert_eq!(RuntimeConfig::parse("  \n").expect("parse"), RuntimeConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = RuntimeConfig::parse(
            r#"{ "output": "out/responses.jsonl", "position": { "latitude": 1.5, "longitude": 2.5, "altitude": null, "accuracy": 8.0 } }"#,
        )
        .expect("parse");
        assert_eq!(config.output, PathBuf::from("out/responses.jsonl"));
        assert_eq!(config.context_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.position.and_then(|fix| fix.latitude),
            Some(1.5)
        );
        assert!(config.catalog.is_none());
    }

    #[test]
    fn explicit_path_errors_surface() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RuntimeConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ nope").expect("seed");
        assert!(matches!(
            RuntimeConfig::load(Some(&broken)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
