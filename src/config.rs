//! Runtime settings.
//!
//! Values come from the process environment (optionally primed from a `.env`
//! file), falling back to the defaults bundled in `assets/config.env`.

use crate::ai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Bundled defaults shipped with the binary
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

/// Model id that routes to the generative-language integration.
pub const GEMINI_MODEL_ID: &str = "gemini";

const DEFAULT_ECHO_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gemini_base_url: String,
    pub gemini_model: String,
    /// Model selected when a conversation starts.
    pub default_model: String,
    /// Simulated latency of placeholder models.
    pub echo_delay: Duration,
    pub request_timeout: Duration,
    /// Where the credential file lives; `None` means the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            default_model: GEMINI_MODEL_ID.to_string(),
            echo_delay: DEFAULT_ECHO_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read settings from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }

        let bundled = parse_env_file(BUNDLED_CONFIG);
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| bundled.get(key).cloned())
        })
    }

    /// Build settings from an arbitrary key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut settings = Self::default();
        if let Some(url) = get("CHATLINE_GEMINI_BASE_URL") {
            settings.gemini_base_url = url;
        }
        if let Some(model) = get("CHATLINE_GEMINI_MODEL") {
            settings.gemini_model = model;
        }
        if let Some(model) = get("CHATLINE_MODEL") {
            settings.default_model = model;
        }
        if let Some(raw) = get("CHATLINE_ECHO_DELAY_MS") {
            settings.echo_delay = Duration::from_millis(parse_number("CHATLINE_ECHO_DELAY_MS", raw)?);
        }
        if let Some(raw) = get("CHATLINE_REQUEST_TIMEOUT_SECS") {
            let secs = parse_number("CHATLINE_REQUEST_TIMEOUT_SECS", raw)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: "CHATLINE_REQUEST_TIMEOUT_SECS",
                    value: "0".to_string(),
                });
            }
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = get("CHATLINE_DATA_DIR") {
            settings.data_dir = Some(PathBuf::from(dir));
        }
        Ok(settings)
    }
}

fn parse_number(key: &'static str, raw: String) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

/// Parse `KEY=VALUE` lines, skipping blanks and `#` comments.
fn parse_env_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
