//! Client settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ClientSettings::base_url`]
pub const ENV_BASE_URL: &str = "SCENE_API_URL";
/// Environment variable overriding [`ClientSettings::timeout_secs`]
pub const ENV_TIMEOUT_SECS: &str = "SCENE_API_TIMEOUT_SECS";

/// Connection settings for the scene server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the backend, e.g. `http://127.0.0.1:5001`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("scene-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".to_string(),
            timeout_secs: 30,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientSettings {
    /// Path of `settings.json` in the platform config directory
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scene-studio", "scene-client")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file (or defaults), then apply environment overrides
    pub fn load() -> Self {
        let mut settings: Self = Self::config_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|json| Self::from_json(&json))
            .unwrap_or_default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Parse a settings file. Missing fields take their defaults; a zero
    /// timeout is replaced by the default one.
    pub fn from_json(json: &str) -> Option<Self> {
        let mut settings = match serde_json::from_str::<Self>(json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring malformed settings file: {e}");
                return None;
            }
        };
        if settings.timeout_secs == 0 {
            tracing::warn!("Ignoring timeout_secs = 0 in settings file");
            settings.timeout_secs = Self::default().timeout_secs;
        }
        Some(settings)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => tracing::warn!("Ignoring invalid {ENV_TIMEOUT_SECS}={raw:?}"),
            }
        }
    }
}
