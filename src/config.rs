use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::llm::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub preference: PreferenceConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Config value, then `GEMINI_MODEL`, then the built-in default.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .or_else(|| env::var("GEMINI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| env::var("GEMINI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatConfig {
    /// Drop the user turn again when its exchange fails.
    #[serde(default)]
    pub rollback_on_failure: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct PreferenceConfig {
    pub language: Option<String>,
}

impl PreferenceConfig {
    /// Configured language, else the `LANG` locale ("zh_CN.UTF-8" -> "zh-CN").
    pub fn detect_lang(&self) -> String {
        if let Some(lang) = &self.language {
            return lang.clone();
        }
        if let Ok(lang) = env::var("LANG") {
            let lang_code = lang.split('.').next().unwrap_or(&lang);
            return lang_code.replace('_', "-");
        }
        "en-US".to_string()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // 1. Path given by environment variable
        if let Ok(path) = env::var("GEMCHAT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        // 2. XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("gemchat").join("config.toml");
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        // 3. Defaults
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
[llm]
api_key = "abc"
model = "gemini-1.5-pro"
base_url = "http://localhost:9000"
timeout_secs = 5

[chat]
rollback_on_failure = true

[preference]
language = "zh-CN"
"#,
        )
        .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("abc"));
        assert_eq!(config.llm.resolved_model(), "gemini-1.5-pro");
        assert_eq!(config.llm.resolved_base_url(), "http://localhost:9000");
        assert_eq!(config.llm.timeout(), Duration::from_secs(5));
        assert!(config.chat.rollback_on_failure);
        assert_eq!(config.preference.detect_lang(), "zh-CN");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.llm.api_key.is_none());
        assert!(!config.chat.rollback_on_failure);
        assert_eq!(config.llm.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_load_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nmodel = 1").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
