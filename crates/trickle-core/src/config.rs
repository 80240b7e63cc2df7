use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::api::HttpTransport;
use crate::error::{Error, Result};
use crate::typing::TypingConfig;

pub const ENDPOINT_ENV: &str = "TRICKLE_ENDPOINT";
pub const TYPING_DELAY_ENV: &str = "TRICKLE_TYPING_DELAY_MS";

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/query";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Whole-request timeout. Unset means a response may stream forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub typing: TypingConfig,

    /// Extra body fields merged into every request, e.g. routing or auth.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: None,
            typing: TypingConfig::default(),
            fields: Map::new(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            Error::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("trickle").join("config.toml"))
    }

    /// Load config from the default location, or return defaults if it is
    /// missing or unreadable.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        match Self::load_from(&path) {
            Ok(config) => Ok(config),
            Err(Error::TomlDe(e)) => {
                tracing::warn!(
                    "Failed to parse config file at {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load config from `path`. Unlike [`Config::load`] a malformed file is
    /// an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Applies `TRICKLE_ENDPOINT` and `TRICKLE_TYPING_DELAY_MS`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by environment variable name.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            let endpoint = endpoint.trim();
            Url::parse(endpoint).map_err(|e| {
                Error::Configuration(format!("Invalid {ENDPOINT_ENV} '{endpoint}': {e}"))
            })?;
            self.endpoint = endpoint.to_string();
        }

        if let Some(delay) = lookup(TYPING_DELAY_ENV).filter(|v| !v.trim().is_empty()) {
            let base_delay_ms = delay.trim().parse::<u64>().map_err(|e| {
                Error::Configuration(format!("Invalid {TYPING_DELAY_ENV} '{delay}': {e}"))
            })?;
            self.typing.base_delay_ms = base_delay_ms;
        }

        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| {
            Error::Configuration(format!("Invalid endpoint '{}': {e}", self.endpoint))
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Builds the HTTP transport described by this config.
    pub fn transport(&self) -> Result<HttpTransport> {
        Ok(HttpTransport::with_timeout(
            self.endpoint_url()?,
            self.request_timeout(),
        )?)
    }
}
