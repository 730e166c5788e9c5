//! Layered configuration loader.
//!
//! Discovers configuration layers (user, cwd, runtime overrides, environment),
//! validates each against the schema, merges them and produces the final
//! `PersonaTalkConfig`.

mod schema;


use crate::{ConfigError, PersonaTalkConfig};
use directories::UserDirs;
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "persona-talk.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".persona-talk";
/// Environment variable overriding `gateway.endpoint`.
const ENV_ENDPOINT: &str = "PERSONA_TALK_ENDPOINT";
/// Environment variable overriding `gateway.api_key`.
const ENV_API_KEY: &str = "PERSONA_TALK_API_KEY";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: PersonaTalkConfig,
    /// Metadata for each layer that contributed values.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Explicit file passed at runtime.
    Runtime,
    /// Process environment overrides (highest precedence).
    Env,
}

impl ConfigLayerSource {
    fn name(&self) -> &'static str {
        match self {
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Runtime => "runtime",
            ConfigLayerSource::Env => "env",
        }
    }
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk, if the layer is a file.
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory searched for a local config file.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.persona-talk/persona-talk.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after file layers; must exist.
    pub runtime_paths: Vec<PathBuf>,
    /// Environment snapshot used for overrides.
    pub env: HashMap<String, String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations and the process environment.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        let env = [ENV_ENDPOINT, ENV_API_KEY]
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect();
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: default_user_config_path(),
            runtime_paths: Vec::new(),
            env,
        }
    }

    /// Add a runtime override config path.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the environment snapshot.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

impl PersonaTalkConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the layered stack using default locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load the layered stack from explicit options.
    ///
    /// Precedence (low -> high): user, cwd, runtime files, environment.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut layers = Vec::new();
        let mut merged = Value::Object(Map::new());

        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.as_ref() {
            candidates.push((ConfigLayerSource::User, path.clone(), false));
        }
        candidates.push((
            ConfigLayerSource::Cwd,
            options.cwd.join(DEFAULT_CONFIG_FILE),
            false,
        ));
        for path in &options.runtime_paths {
            candidates.push((ConfigLayerSource::Runtime, path.clone(), true));
        }

        let mut seen = Vec::new();
        for (source, path, required) in candidates {
            if !required && !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let unique = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.contains(&unique) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            seen.push(unique);
            let value = load_layer_file(source, &path)?;
            merge_values(&mut merged, &value);
            layers.push(ConfigLayer {
                source,
                path: Some(path),
            });
        }

        if let Some(overlay) = env_overlay(&options.env) {
            debug!("applying environment overrides");
            merge_values(&mut merged, &overlay);
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Env,
                path: None,
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "gateway.endpoint must not be empty".to_string(),
            ));
        }
        for (name, settings) in [
            ("coach", &self.personas.coach),
            ("tutor", &self.personas.tutor),
            ("gems", &self.personas.gems),
        ] {
            if settings.model.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "personas.{name}.model must not be empty"
                )));
            }
            if !(0.0..=2.0).contains(&settings.temperature) {
                return Err(ConfigError::Invalid(format!(
                    "personas.{name}.temperature must be between 0 and 2"
                )));
            }
        }
        if self.speech.enabled && self.speech.rate <= 0.0 {
            return Err(ConfigError::Invalid(
                "speech.rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read, parse and schema-check one layer file.
fn load_layer_file(source: ConfigLayerSource, path: &Path) -> Result<Value, ConfigError> {
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    let label = format!("{}({})", source.name(), path.display());
    schema::validate_layer_schema(&value, &label)?;
    Ok(value)
}

/// Build a partial config from recognised environment variables.
fn env_overlay(env: &HashMap<String, String>) -> Option<Value> {
    let mut gateway = Map::new();
    if let Some(endpoint) = env.get(ENV_ENDPOINT).filter(|value| !value.is_empty()) {
        gateway.insert("endpoint".to_string(), Value::String(endpoint.clone()));
    }
    if let Some(key) = env.get(ENV_API_KEY).filter(|value| !value.is_empty()) {
        gateway.insert("api_key".to_string(), Value::String(key.clone()));
    }
    if gateway.is_empty() {
        return None;
    }
    let mut root = Map::new();
    root.insert("gateway".to_string(), Value::Object(gateway));
    Some(Value::Object(root))
}

/// Merge overlay into base: objects merge key by key, everything else replaces.
fn merge_values(base: &mut Value, overlay: &Value) {
    if let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut *base, overlay) {
        for (key, value) in overlay_map {
            match base_map.get_mut(key) {
                Some(existing) => merge_values(existing, value),
                None => {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        return;
    }
    *base = overlay.clone();
}

fn config_from_value(value: Value, label: &str) -> Result<PersonaTalkConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: PersonaTalkConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

/// Default user config path under the home directory.
fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}
