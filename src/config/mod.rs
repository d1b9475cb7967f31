//! Configuration management for labchat

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config directory name under the user config dir
const CONFIG_DIR: &str = "labchat";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub dispatch: DispatchConfig,
    pub upload: UploadConfig,
    pub history: HistoryConfig,
}

/// Model-dispatch endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// OpenAI-compatible endpoint base URL
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds (long generations take a while)
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "LABCHAT_API_KEY".to_string(),
            timeout_secs: 300,
            max_tokens: 4096,
            temperature: None,
        }
    }
}

impl DispatchConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

/// Object-store upload endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub base_url: String,
    /// Per-file size ceiling in bytes
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "https://files.example.com/uploads".to_string(),
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// History-window settings for dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of recent messages sent with each dispatch
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { window: 20 }
    }
}

impl Config {
    /// Path to the user-level config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join("config.toml"))
    }

    /// Load from the user config dir, falling back to defaults when the
    /// file is absent
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config.toml")
    }

    /// Save to the user config dir
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path().context("Could not determine config directory")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history.window, 20);
        assert_eq!(config.dispatch.max_tokens, 4096);
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert!(config.dispatch.temperature.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [dispatch]
            base_url = "https://llm.internal/v1"

            [history]
            window = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.dispatch.base_url, "https://llm.internal/v1");
        assert_eq!(config.dispatch.max_tokens, 4096);
        assert_eq!(config.history.window, 8);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.dispatch.base_url, config.dispatch.base_url);
        assert_eq!(parsed.history.window, config.history.window);
    }
}
