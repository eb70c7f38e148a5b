//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may name only the fields it overrides.

mod cluster;
mod events;

pub use cluster::*;
pub use events::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "cluster": { "url": "http://m1:8080,http://m2:8080" },
///   "events": { "transport": "sse" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarathonSettings {
    /// Cluster members and request layer.
    pub cluster: ClusterSettings,
    /// Event subscription transport.
    pub events: EventsSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl MarathonSettings {
    /// Correct values that would stall or spin the event machinery.
    ///
    /// Called automatically during loading. Zero intervals and buffers are
    /// raised to their minimum with a warning rather than rejected.
    pub fn validate(&mut self) {
        fn raise_to<T: PartialOrd + Copy + std::fmt::Display>(val: &mut T, min: T, name: &str) {
            if *val < min {
                tracing::warn!("{name} below minimum ({val}), raised to {min}");
                *val = min;
            }
        }

        raise_to(&mut self.events.reconnect_interval_ms, 1, "reconnect_interval_ms");
        raise_to(&mut self.events.listener_buffer, 1, "listener_buffer");
        raise_to(&mut self.events.max_body_bytes, 1, "max_body_bytes");
        raise_to(&mut self.cluster.polling_wait_time_ms, 1, "polling_wait_time_ms");
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: MarathonSettings =
            serde_json::from_str(r#"{"events": {"transport": "sse"}}"#).unwrap();
        assert_eq!(settings.events.transport, "sse");
        assert_eq!(settings.events.port, 10001);
        assert_eq!(settings.cluster.url, "http://127.0.0.1:8080");
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn validate_raises_zero_values() {
        let mut settings = MarathonSettings::default();
        settings.events.reconnect_interval_ms = 0;
        settings.events.listener_buffer = 0;
        settings.validate();
        assert_eq!(settings.events.reconnect_interval_ms, 1);
        assert_eq!(settings.events.listener_buffer, 1);
    }

    #[test]
    fn validate_leaves_sane_values() {
        let mut settings = MarathonSettings::default();
        settings.validate();
        assert_eq!(settings.events.reconnect_interval_ms, 5000);
        assert_eq!(settings.events.listener_buffer, 16);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(MarathonSettings::default()).unwrap();
        assert!(value["events"].get("reconnectIntervalMs").is_some());
        assert!(value["cluster"].get("pollingWaitTimeMs").is_some());
        assert!(value["events"].get("callbackUrl").is_none());
    }
}
