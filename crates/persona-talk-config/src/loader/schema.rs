//! Schema validation for persona-talk JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single (possibly partial) config layer.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema", "gateway", "personas", "storage", "notice", "speech",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("gateway") {
        validate_gateway(value, layer, "gateway")?;
    }
    if let Some(value) = map.get("personas") {
        let personas = expect_object(value, layer, "personas")?;
        ensure_allowed_keys(personas, &["coach", "tutor", "gems"], layer, "personas")?;
        for (key, entry) in personas {
            validate_model_settings(entry, layer, &join_path("personas", key))?;
        }
    }
    if let Some(value) = map.get("storage") {
        let storage = expect_object(value, layer, "storage")?;
        ensure_allowed_keys(storage, &["gems_path", "logs_path"], layer, "storage")?;
        for (key, entry) in storage {
            expect_string(entry, layer, &join_path("storage", key))?;
        }
    }
    if let Some(value) = map.get("notice") {
        let notice = expect_object(value, layer, "notice")?;
        ensure_allowed_keys(notice, &["duration_ms"], layer, "notice")?;
        if let Some(value) = notice.get("duration_ms") {
            expect_u64(value, layer, "notice.duration_ms")?;
        }
    }
    if let Some(value) = map.get("speech") {
        validate_speech(value, layer, "speech")?;
    }

    Ok(())
}

/// Validate the "gateway" block.
fn validate_gateway(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["endpoint", "api_key", "api_key_env"], layer, path)?;
    for (key, entry) in map {
        expect_string(entry, layer, &join_path(path, key))?;
    }
    Ok(())
}

/// Validate one persona's model settings; all keys are optional in a layer.
fn validate_model_settings(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["model", "temperature", "max_tokens"], layer, path)?;
    if let Some(value) = map.get("model") {
        expect_string(value, layer, &join_path(path, "model"))?;
    }
    if let Some(value) = map.get("temperature") {
        expect_f64(value, layer, &join_path(path, "temperature"))?;
    }
    if let Some(value) = map.get("max_tokens") {
        expect_u64(value, layer, &join_path(path, "max_tokens"))?;
    }
    Ok(())
}

/// Validate the "speech" block.
fn validate_speech(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["enabled", "command", "args", "language", "rate"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("enabled") {
        expect_bool(value, layer, &join_path(path, "enabled"))?;
    }
    if let Some(value) = map.get("command") {
        expect_string(value, layer, &join_path(path, "command"))?;
    }
    if let Some(value) = map.get("args") {
        validate_string_array(value, layer, &join_path(path, "args"))?;
    }
    if let Some(value) = map.get("language") {
        expect_string(value, layer, &join_path(path, "language"))?;
    }
    if let Some(value) = map.get("rate") {
        expect_f64(value, layer, &join_path(path, "rate"))?;
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string")),
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Bool(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected bool")),
    }
}

/// Non-negative integers only.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Some(entries) = value.as_array() else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    match entries.iter().position(|entry| !entry.is_string()) {
        Some(idx) => Err(invalid_field(
            layer,
            &format!("{path}[{idx}]"),
            "expected string",
        )),
        None => Ok(()),
    }
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
