//! Project configuration for contract runs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable holding the target service base URL.
pub const BASE_URL_ENV: &str = "RECETTE_API_URL";

/// Default fixture document location, relative to the working directory.
pub const DEFAULT_FIXTURES: &str = "tests/recette/definition.yaml";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the geocoding service under test (overridden by `RECETTE_API_URL`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Fixture document (YAML or JSON)
    #[serde(default = "default_fixtures")]
    pub fixtures: PathBuf,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP headers sent with every request (API keys, etc.)
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Dump every exchange to JSONL files
    #[serde(default)]
    pub dump: bool,

    /// Directory for dump files (default: ".recette/dumps")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<PathBuf>,
}

fn default_fixtures() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURES)
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            fixtures: default_fixtures(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: HashMap::new(),
            dump: false,
            dump_dir: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.recette.toml), falling back to defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".recette.toml", ".recette.json", "recette.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Apply `RECETTE_API_URL` from the process environment, if set.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    /// Replace the base URL when `value` is non-empty.
    #[must_use]
    pub fn with_base_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.base_url = Some(url);
        }
        self
    }

    /// Resolved base URL without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] when no source provided one.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# recette configuration

# Geocoding service under test (RECETTE_API_URL overrides this)
base_url = "http://localhost:3000"

# Fixture document: route -> list of cases
fixtures = "tests/recette/definition.yaml"

# Per-request timeout in seconds
timeout_secs = 10

# HTTP headers sent with every request
[headers]
# X-API-Key = "your-api-key"

# Dump every request/response pair to JSONL files (default: false)
# dump = true
# dump_dir = ".recette/dumps"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("{BASE_URL_ENV} is required to run contract tests (set it or pass --base-url)")]
    MissingBaseUrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.fixtures, PathBuf::from(DEFAULT_FIXTURES));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
base_url = "https://geo.example.org/geocodage"
fixtures = "fixtures/recette.yaml"
timeout_secs = 3

[headers]
X-API-Key = "k3y"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.base_url.as_deref(),
            Some("https://geo.example.org/geocodage")
        );
        assert_eq!(config.fixtures, PathBuf::from("fixtures/recette.yaml"));
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.headers.get("X-API-Key"), Some(&"k3y".to_string()));
    }

    #[test]
    fn parse_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recette.json");
        std::fs::write(&path, r#"{"base_url": "http://localhost:3000"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url().unwrap(), "http://localhost:3000");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/recette.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn missing_base_url_is_fatal() {
        let config = Config::default();
        assert!(matches!(config.base_url(), Err(ConfigError::MissingBaseUrl)));
    }

    #[test]
    fn empty_base_url_counts_as_missing() {
        let config = Config {
            base_url: Some("   ".into()),
            ..Config::default()
        };
        assert!(matches!(config.base_url(), Err(ConfigError::MissingBaseUrl)));
    }

    #[test]
    fn override_replaces_file_value() {
        let config = Config {
            base_url: Some("http://from-file".into()),
            ..Config::default()
        }
        .with_base_url_override(Some("http://from-env".into()));
        assert_eq!(config.base_url().unwrap(), "http://from-env");
    }

    #[test]
    fn empty_override_keeps_file_value() {
        let config = Config {
            base_url: Some("http://from-file".into()),
            ..Config::default()
        }
        .with_base_url_override(Some(String::new()));
        assert_eq!(config.base_url().unwrap(), "http://from-file");
    }

    #[test]
    fn trailing_slash_trimmed() {
        let config = Config::default().with_base_url_override(Some("http://host/api/".into()));
        assert_eq!(config.base_url().unwrap(), "http://host/api");
    }

    #[test]
    fn example_parses() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        assert_eq!(config.base_url().unwrap(), "http://localhost:3000");
        assert!(!config.dump);
    }
}
