//! Fixture configuration: target server, default headers, client behavior

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the base URL.
pub const BASE_URL_ENV: &str = "API_URL";

/// Base URL used when neither a config file nor the environment sets one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Fixture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Base URL of the server under test
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Headers sent with every request (auth, API keys, etc.)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Per-request timeout in seconds (none by default)
    #[serde(default)]
    pub timeout_secs: Option<f64>,

    /// Follow 3xx responses instead of returning them to assertions
    #[serde(default)]
    pub follow_redirects: bool,

    /// Mask sensitive header values in the exchange log
    #[serde(default = "default_true")]
    pub mask_headers: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            headers: BTreeMap::new(),
            timeout_secs: None,
            follow_redirects: false,
            mask_headers: true,
        }
    }
}

impl FixtureConfig {
    /// Load config from file (`.json` as JSON, anything else as TOML)
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

    /// Load the first config file found in `dir`, or defaults if none exists.
    ///
    /// # Errors
    ///
    /// Returns error if a candidate exists but cannot be read or parsed
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [".apifixture.toml", ".apifixture.json", "apifixture.toml"];

        for name in candidates {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load from the current directory, then apply the `API_URL` override.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_with_env(Path::new("."), |name| std::env::var(name).ok())
    }

    /// Load from `dir`, then apply the base URL override looked up through `env`.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_with_env<F>(dir: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::load_from_dir(dir)?;
        Ok(config.with_base_url_override(env(BASE_URL_ENV)))
    }

    /// Replace the base URL if `value` is set and non-empty.
    #[must_use]
    pub fn with_base_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    /// Example config file
    pub fn example() -> &'static str {
        r#"# apifixture configuration

# Server under test (overridden by the API_URL environment variable)
base_url = "http://localhost:5000"

# Per-request timeout in seconds (disabled by default)
# timeout_secs = 10.0

# Follow redirects instead of asserting on 3xx responses (default: false)
# follow_redirects = false

# Mask Authorization, Cookie and API key headers in the request log (default: true)
# mask_headers = true

# Headers sent with every request
[headers]
# Authorization = "Bearer your-token-here"
# X-API-Key = "your-api-key"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
