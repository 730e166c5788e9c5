//! Configuration schema for persona-talk.

use crate::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when `gateway.api_key_env` is unset.
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
/// Secondary environment variable checked after the configured one.
pub const FALLBACK_API_KEY_ENV: &str = "NEXT_PUBLIC_GROQ_API_KEY";

/// Root config for persona-talk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonaTalkConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub personas: PersonasConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notice: NoticeConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl PersonaTalkConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PersonaTalkConfigBuilder {
        PersonaTalkConfigBuilder::new()
    }
}

/// Builder for assembling a `PersonaTalkConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PersonaTalkConfigBuilder {
    config: PersonaTalkConfig,
}

impl PersonaTalkConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the gateway configuration.
    pub fn gateway(mut self, gateway: GatewayConfig) -> Self {
        self.config.gateway = gateway;
        self
    }

    /// Replace the per-persona model settings.
    pub fn personas(mut self, personas: PersonasConfig) -> Self {
        self.config.personas = personas;
        self
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the notice configuration.
    pub fn notice(mut self, notice: NoticeConfig) -> Self {
        self.config.notice = notice;
        self
    }

    /// Replace the speech configuration.
    pub fn speech(mut self, speech: SpeechConfig) -> Self {
        self.config.speech = speech;
        self
    }

    /// Finalize and return the built config.
    pub fn build(self) -> PersonaTalkConfig {
        self.config
    }
}

/// Connection settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Inline key; takes precedence over the environment.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the API key from the process environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key using `lookup` for environment access.
    ///
    /// Order: inline `api_key`, the `api_key_env` variable, then
    /// `NEXT_PUBLIC_GROQ_API_KEY`. Blank values are skipped.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_ref().filter(|key| !key.trim().is_empty()) {
            return Ok(key.clone());
        }
        let mut checked = vec![self.api_key_env.clone()];
        if self.api_key_env != FALLBACK_API_KEY_ENV {
            checked.push(FALLBACK_API_KEY_ENV.to_string());
        }
        let found = checked
            .iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty());
        found.ok_or(ConfigError::MissingApiKey { checked })
    }
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Sampling settings sent with each completion call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSettings {
    fn new(model: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }
}

/// Model settings per persona family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonasConfig {
    #[serde(default = "default_coach_settings")]
    pub coach: ModelSettings,
    #[serde(default = "default_tutor_settings")]
    pub tutor: ModelSettings,
    #[serde(default = "default_gem_settings")]
    pub gems: ModelSettings,
}

impl Default for PersonasConfig {
    fn default() -> Self {
        Self {
            coach: default_coach_settings(),
            tutor: default_tutor_settings(),
            gems: default_gem_settings(),
        }
    }
}

fn default_coach_settings() -> ModelSettings {
    ModelSettings::new("llama-3.3-70b-versatile", 0.8, 256)
}

fn default_tutor_settings() -> ModelSettings {
    ModelSettings::new("llama3-8b-8192", 0.7, 512)
}

fn default_gem_settings() -> ModelSettings {
    ModelSettings::new("llama-3.3-70b-versatile", 0.8, 512)
}

/// Locations of the local persona store and the learning log database.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub gems_path: Option<String>,
    #[serde(default)]
    pub logs_path: Option<String>,
}

impl StorageConfig {
    /// Gem store file, defaulting to the platform data directory.
    pub fn gems_file(&self) -> Option<PathBuf> {
        resolve_data_path(self.gems_path.as_deref(), "gems.json")
    }

    /// Learning log database, defaulting to the platform data directory.
    pub fn logs_file(&self) -> Option<PathBuf> {
        resolve_data_path(self.logs_path.as_deref(), "learning_logs.sqlite3")
    }
}

fn resolve_data_path(configured: Option<&str>, file_name: &str) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("", "", "persona-talk").map(|dirs| dirs.data_dir().join(file_name))
}

/// Lifetime of transient side-effect notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_notice_duration_ms")]
    pub duration_ms: u64,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_notice_duration_ms(),
        }
    }
}

fn default_notice_duration_ms() -> u64 {
    4000
}

/// Speech playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,
    /// External text-to-speech program; playback is silent when unset.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed before the text.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_speech_language")]
    pub language: String,
    #[serde(default = "default_speech_rate")]
    pub rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
            command: None,
            args: Vec::new(),
            language: default_speech_language(),
            rate: default_speech_rate(),
        }
    }
}

fn default_speech_enabled() -> bool {
    true
}

fn default_speech_language() -> String {
    "ja-JP".to_string()
}

fn default_speech_rate() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, FALLBACK_API_KEY_ENV, GatewayConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn inline_api_key_wins() {
        let config = GatewayConfig {
            api_key: Some("inline".to_string()),
            ..GatewayConfig::default()
        };
        let key = config
            .resolve_api_key_with(|_| Some("env".to_string()))
            .expect("key");
        assert_eq!(key, "inline");
    }

    #[test]
    fn falls_back_to_public_env_name() {
        let config = GatewayConfig::default();
        let key = config
            .resolve_api_key_with(|name| {
                (name == FALLBACK_API_KEY_ENV).then(|| "fallback".to_string())
            })
            .expect("key");
        assert_eq!(key, "fallback");
    }

    #[test]
    fn blank_keys_are_missing() {
        let config = GatewayConfig {
            api_key: Some("  ".to_string()),
            ..GatewayConfig::default()
        };
        let err = config
            .resolve_api_key_with(|_| Some(String::new()))
            .unwrap_err();
        match err {
            ConfigError::MissingApiKey { checked } => {
                assert_eq!(
                    checked,
                    vec!["GROQ_API_KEY".to_string(), FALLBACK_API_KEY_ENV.to_string()]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
