//! Layered settings loading.
//!
//! Compiled defaults are serialized to JSON, the settings file (if any) is
//! merged over them key by key, and the result is deserialized back before
//! `MARATHON_*` environment variables are applied on top. Nested objects
//! merge recursively; any other value in the file replaces the default
//! outright, except `null`, which leaves the default in place.

use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::MarathonSettings;

/// Load settings from `path`, then apply environment overrides and validate.
///
/// A missing file yields defaults. A file that is not a JSON object is an error.
pub fn load_settings_from_path(path: &Path) -> Result<MarathonSettings> {
    let mut layered = serde_json::to_value(MarathonSettings::default())?;

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let file: Value = serde_json::from_str(&content)?;
            if !file.is_object() {
                return Err(SettingsError::InvalidValue(format!(
                    "{} must contain a JSON object",
                    path.display()
                )));
            }
            debug!(?path, "merging settings file over defaults");
            merge_layer(&mut layered, file);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(?path, "no settings file, using defaults");
        }
        Err(e) => return Err(e.into()),
    }

    let mut settings: MarathonSettings = serde_json::from_value(layered)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Merge `layer` into `base` in place.
pub fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Apply `MARATHON_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut MarathonSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides, reading variables through `lookup`.
///
/// Empty values are skipped. Values that fail to parse are logged and skipped.
pub fn apply_overrides_from(
    settings: &mut MarathonSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("MARATHON_URL") {
        settings.cluster.url = v;
    }
    if let Some(v) = var("MARATHON_DCOS_TOKEN") {
        settings.cluster.dcos_token = Some(v);
    }
    if let Some(v) = var("MARATHON_HTTP_USER") {
        settings.cluster.http_basic_auth_user = Some(v);
    }
    if let Some(v) = var("MARATHON_HTTP_PASSWORD") {
        settings.cluster.http_basic_password = Some(v);
    }

    if let Some(v) = var("MARATHON_EVENTS_TRANSPORT") {
        settings.events.transport = v.to_lowercase();
    }
    if let Some(v) = var("MARATHON_EVENTS_INTERFACE") {
        settings.events.interface = v;
    }
    if let Some(port) = numeric(&var, "MARATHON_EVENTS_PORT", 0..=u16::MAX) {
        settings.events.port = port;
    }
    if let Some(v) = var("MARATHON_CALLBACK_URL") {
        settings.events.callback_url = Some(v.trim_end_matches('/').to_string());
    }
    if let Some(ms) = numeric(&var, "MARATHON_RECONNECT_INTERVAL_MS", 1..=3_600_000) {
        settings.events.reconnect_interval_ms = ms;
    }

    if let Some(v) = var("MARATHON_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(raw) = var("MARATHON_LOG_JSON") {
        match parse_flag(&raw) {
            Some(json) => settings.logging.json = json,
            None => warn!(key = "MARATHON_LOG_JSON", value = %raw, "ignoring non-boolean env var"),
        }
    }
}

fn numeric<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    range: std::ops::RangeInclusive<T>,
) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    let raw = var(key)?;
    let parsed = parse_in_range(&raw, &range);
    if parsed.is_none() {
        warn!(key, value = %raw, "ignoring out-of-range env var");
    }
    parsed
}

/// Parse `raw` as a `T` inside `range`.
pub fn parse_in_range<T>(raw: &str, range: &std::ops::RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

/// Parse an on/off style flag (`true`, `1`, `yes`, `on` and their negations).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
