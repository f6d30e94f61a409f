use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::StoryFeed;
use crate::coordinator::FailurePolicy;
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub api: ApiConfig,
    pub loading: LoadConfig,
    /// Leave unset to show titles in the language the API serves them in.
    pub translation: Option<TranslationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub feed: StoryFeed,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Rows loaded on display.
    pub visible_rows: usize,
    /// Rows past the visible ones handed to `prefetch`.
    pub prefetch_window: usize,
    pub max_concurrent_fetches: usize,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// LibreTranslate-compatible `/translate` endpoint.
    pub endpoint: String,
    pub source_language: String,
    /// Falls back to the process locale when unset.
    pub target_language: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            feed: StoryFeed::default(),
            request_timeout_seconds: 10,
            user_agent: format!("hn-reader/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            visible_rows: 20,
            prefetch_window: 10,
            max_concurrent_fetches: 8,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000/translate".to_owned(),
            source_language: "en".to_owned(),
            target_language: None,
            api_key: None,
        }
    }
}

impl ReaderConfig {
    /// `<config dir>/hn-reader/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        // Linux: ~/.config/hn-reader, macOS: ~/Library/Application Support/hn-reader
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("hn-reader").join("config.json"))
    }

    /// Loads the config file, or falls back to defaults (and tries to write
    /// them out so the user has a file to edit).
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                match config.save(path) {
                    Ok(()) => info!(path = %path.display(), "wrote default configuration"),
                    Err(err) => warn!(error = %err, "failed to save default configuration"),
                }
                config
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to load configuration, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
