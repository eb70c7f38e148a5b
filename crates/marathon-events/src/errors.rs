//! Error types for the event subscription engine.
//!
//! - [`EventsError`]: everything surfaced to callers of the hub, plus the
//!   per-item decode failures that transports log and drop
//! - [`ClusterError`]: request-layer failures against cluster members
//! - [`HandshakeError`] / [`StreamError`]: event stream connection and read
//!   failures inside the pull transport

use std::net::SocketAddr;

use marathon_core::events::{CatalogError, EventKind};
use marathon_core::text::preview;
use thiserror::Error;

/// Bytes of offending content kept in decode error messages.
const CONTENT_PREVIEW_BYTES: usize = 256;

/// Errors from the event hub, transports, and decoder.
#[derive(Debug, Error)]
pub enum EventsError {
    /// The configured transport identifier is not supported.
    #[error("the events transport '{transport}' is not supported")]
    Configuration {
        /// Identifier as configured.
        transport: String,
    },

    /// The advertised interface address could not be resolved.
    #[error("unable to get the ip address from the interface '{name}': {reason}")]
    Interface {
        /// Interface name as configured.
        name: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The callback listener could not bind.
    #[error("failed to bind the callback listener on {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// A request against the cluster failed.
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// The payload is not a JSON object carrying an `eventType` tag.
    #[error(
        "failed to decode the event type, content: {}, error: {reason}",
        preview(.content, CONTENT_PREVIEW_BYTES)
    )]
    Decode {
        /// Raw payload as received.
        content: String,
        /// Parser message.
        reason: String,
    },

    /// The `eventType` tag is not in the event catalog.
    #[error("unable to handle event, type: {tag}")]
    UnknownEvent {
        /// Tag as received.
        tag: String,
    },

    /// The payload does not match the shape of its declared event kind.
    #[error("failed to decode the event '{kind}': {source}")]
    Payload {
        /// Kind named by the tag.
        kind: EventKind,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

impl EventsError {
    /// Per-item protocol failures: logged and dropped, never fatal to a transport.
    pub fn is_decode_class(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::UnknownEvent { .. } | Self::Payload { .. }
        )
    }
}

impl From<CatalogError> for EventsError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownEvent { tag } => Self::UnknownEvent { tag },
        }
    }
}

/// Request-layer failures.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Every member is marked down.
    #[error("no cluster member is available")]
    NoAvailableMember,

    /// The cluster configuration cannot produce a client.
    #[error("invalid cluster configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// A request could not be constructed. Indicates malformed internal
    /// state (bad member URL or header), never a network condition.
    #[error("failed to build request: {reason}")]
    RequestBuild {
        /// Builder message.
        reason: String,
    },

    /// The request could not be completed against a member.
    #[error("request to {member} failed: {source}")]
    Http {
        /// Member base URL.
        member: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The member answered with a non-success status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        /// HTTP method.
        method: String,
        /// Request path.
        path: String,
        /// Status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClusterError {
    /// Whether this failure is a programming-invariant violation rather than
    /// an environmental one.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::RequestBuild { .. })
    }
}

/// Event stream subscription handshake failures against one member.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The request did not complete.
    #[error("event stream request to {member} failed: {source}")]
    Http {
        /// Member base URL.
        member: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The member refused the stream.
    #[error("{member} answered the event stream request with {status}")]
    Status {
        /// Member base URL.
        member: String,
        /// Status code.
        status: u16,
    },
}

/// Terminal event stream conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Reading or parsing the stream failed.
    #[error("event stream read failed: {0}")]
    Read(String),

    /// The remote closed the stream.
    #[error("event stream closed by remote")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_transport() {
        let err = EventsError::Configuration {
            transport: "websocket".into(),
        };
        assert_eq!(
            err.to_string(),
            "the events transport 'websocket' is not supported"
        );
    }

    #[test]
    fn decode_error_previews_long_content() {
        let err = EventsError::Decode {
            content: "x".repeat(10_000),
            reason: "expected value".into(),
        };
        let msg = err.to_string();
        assert!(msg.len() < 400, "message not truncated: {} bytes", msg.len());
        assert!(msg.ends_with("error: expected value"));
    }

    #[test]
    fn catalog_error_converts_to_unknown_event() {
        let err: EventsError = CatalogError::UnknownEvent {
            tag: "pod_created_event".into(),
        }
        .into();
        assert!(matches!(err, EventsError::UnknownEvent { ref tag } if tag == "pod_created_event"));
        assert!(err.is_decode_class());
    }

    #[test]
    fn transport_errors_are_not_decode_class() {
        let err = EventsError::Cluster(ClusterError::NoAvailableMember);
        assert!(!err.is_decode_class());
    }

    #[test]
    fn only_request_build_is_structural() {
        assert!(ClusterError::RequestBuild { reason: "bad url".into() }.is_structural());
        assert!(!ClusterError::NoAvailableMember.is_structural());
        assert!(
            !ClusterError::Status {
                method: "GET".into(),
                path: "/v2/events".into(),
                status: 503,
                body: String::new(),
            }
            .is_structural()
        );
    }
}
