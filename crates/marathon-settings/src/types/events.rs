//! Event subscription transport settings.

use serde::{Deserialize, Serialize};

/// Transport identifier for the callback (push) transport.
pub const TRANSPORT_CALLBACK: &str = "callback";
/// Transport identifier for the server-sent events (pull) transport.
pub const TRANSPORT_SSE: &str = "sse";

/// How events reach this process.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventsSettings {
    /// [`TRANSPORT_CALLBACK`] or [`TRANSPORT_SSE`]. Validated when the first
    /// listener attaches.
    pub transport: String,
    /// Interface name (or literal IP) whose address is advertised in the callback URL.
    pub interface: String,
    /// Port the callback listener binds. `0` picks an ephemeral port.
    pub port: u16,
    /// Externally reachable base URL overriding the derived `http://<ip>:<port>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Fixed wait between failed event stream connection attempts.
    pub reconnect_interval_ms: u64,
    /// Capacity of each listener's delivery channel.
    pub listener_buffer: usize,
    /// Largest callback request body read before the request is dropped.
    pub max_body_bytes: usize,
}

impl Default for EventsSettings {
    fn default() -> Self {
        Self {
            transport: TRANSPORT_CALLBACK.to_string(),
            interface: "eth0".to_string(),
            port: 10001,
            callback_url: None,
            reconnect_interval_ms: 5000,
            listener_buffer: 16,
            max_body_bytes: 1 << 20,
        }
    }
}
