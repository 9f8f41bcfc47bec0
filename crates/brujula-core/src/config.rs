//! Runtime configuration loaded from `.env` / environment, with an optional
//! `user_config.toml` carrying the user's own API key and display name.
//!
//! | Env | Default | Description |
//! |-----|---------|--------------|
//! | BRUJULA_GENAI_API_KEY | – | Generative-AI API key. Unset disables the coach. |
//! | BRUJULA_GENAI_BASE_URL | Google endpoint | Base URL for chat + speech requests. |
//! | BRUJULA_CHAT_MODEL | gemini-2.5-flash | Chat / function-calling model id. |
//! | BRUJULA_TTS_MODEL | gemini-2.5-flash-preview-tts | Speech synthesis model id. |
//! | BRUJULA_STORE_URL | – | Document store base URL. Unset = local-only mode. |
//! | BRUJULA_DEBOUNCE_MS | 600 | Quiet period before a state write. |
//! | BRUJULA_POLL_INTERVAL_MS | 2000 | Document change-poll cadence. |
//! | BRUJULA_DATA_DIR | ./data | Device id, Sled cache, user_config.toml. |

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_GENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub genai_api_key: Option<String>,
    pub genai_base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    /// Document store base URL. `None` means no cloud backend: the sync
    /// engine reports `Local` and never makes a remote call.
    pub store_base_url: Option<String>,
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            genai_api_key: None,
            genai_base_url: DEFAULT_GENAI_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            store_base_url: None,
            debounce_ms: 600,
            poll_interval_ms: 2_000,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, then environment variables, then lets `user_config.toml`
    /// (in the data dir) override the API key and display name.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::from_env();
        if let Ok(user) = UserConfig::load_from_path(&config.user_config_path()) {
            if config.genai_api_key.is_none() {
                config.genai_api_key = user.api_key.filter(|k| !k.trim().is_empty());
            }
        }
        config
    }

    /// Environment only; unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            genai_api_key: env_opt_string("BRUJULA_GENAI_API_KEY"),
            genai_base_url: env_opt_string("BRUJULA_GENAI_BASE_URL")
                .unwrap_or(defaults.genai_base_url),
            chat_model: env_opt_string("BRUJULA_CHAT_MODEL").unwrap_or(defaults.chat_model),
            tts_model: env_opt_string("BRUJULA_TTS_MODEL").unwrap_or(defaults.tts_model),
            store_base_url: env_opt_string("BRUJULA_STORE_URL"),
            debounce_ms: env_u64("BRUJULA_DEBOUNCE_MS", defaults.debounce_ms),
            poll_interval_ms: env_u64("BRUJULA_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            data_dir: env_opt_string("BRUJULA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    pub fn is_cloud_enabled(&self) -> bool {
        self.store_base_url.is_some()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join("device_id")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("document_cache")
    }

    pub fn user_config_path(&self) -> PathBuf {
        self.data_dir.join("user_config.toml")
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// User-owned settings stored in `user_config.toml`, so a user can supply
/// their own API key without touching the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, crate::CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::CoreError::Config(e.to_string()))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), crate::CoreError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_only() {
        let config = AppConfig::default();
        assert!(!config.is_cloud_enabled());
        assert_eq!(config.debounce(), Duration::from_millis(600));
    }

    #[test]
    fn user_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_config.toml");

        let config = UserConfig {
            api_key: Some("k-123".to_string()),
            display_name: Some("Ada".to_string()),
        };
        config.save_to_path(&path).unwrap();

        let loaded = UserConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("k-123"));
        assert_eq!(loaded.display_name.as_deref(), Some("Ada"));
    }
}
