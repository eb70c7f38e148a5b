//! Raw payload to typed [`Event`].
//!
//! Decoding is two-phase: read only the `eventType` tag, look the tag up in
//! the catalog, then parse the whole payload as that kind's shape.

use marathon_core::events::Event;
use serde::Deserialize;

use crate::errors::EventsError;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "eventType")]
    event_type: String,
}

/// Decode one raw JSON payload.
///
/// # Errors
///
/// - [`EventsError::Decode`] when the payload is not an object with a string `eventType`
/// - [`EventsError::UnknownEvent`] when the tag is not in the catalog
/// - [`EventsError::Payload`] when the payload does not fit the tagged kind
pub fn decode(raw: &str) -> Result<Event, EventsError> {
    let envelope: Envelope = serde_json::from_str(raw).map_err(|e| EventsError::Decode {
        content: raw.to_string(),
        reason: e.to_string(),
    })?;
    let kind = marathon_core::EventKind::from_tag(&envelope.event_type)?;
    let payload = kind
        .decode(raw)
        .map_err(|source| EventsError::Payload { kind, source })?;
    Ok(Event { kind, payload })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use marathon_core::events::{EventKind, EventPayload};

    use super::*;

    #[test]
    fn decodes_status_update() {
        let raw = r#"{
            "eventType": "status_update_event",
            "timestamp": "2024-05-01T10:00:00.000Z",
            "slaveId": "agent-1",
            "taskId": "web.1",
            "taskStatus": "TASK_RUNNING",
            "appId": "/web",
            "host": "10.0.0.7",
            "ports": [31000],
            "version": "2024-05-01T09:59:00.000Z"
        }"#;
        let event = decode(raw).unwrap();
        assert_eq!(event.kind, EventKind::StatusUpdate);
        assert_matches!(event.payload, EventPayload::StatusUpdate(ref e) if e.task_status == "TASK_RUNNING");
    }

    #[test]
    fn decodes_deployment_step_failure() {
        let raw = r#"{"eventType": "deployment_step_failure", "currentStep": {"actions": []}}"#;
        assert_eq!(decode(raw).unwrap().kind, EventKind::DeploymentStepFailure);
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = decode("{not json").unwrap_err();
        assert_matches!(err, EventsError::Decode { ref content, .. } if content == "{not json");
    }

    #[test]
    fn missing_tag_is_decode_error() {
        assert_matches!(decode(r#"{"appId": "/web"}"#), Err(EventsError::Decode { .. }));
    }

    #[test]
    fn non_string_tag_is_decode_error() {
        assert_matches!(decode(r#"{"eventType": 7}"#), Err(EventsError::Decode { .. }));
    }

    #[test]
    fn unknown_tag_is_reported_by_name() {
        let err = decode(r#"{"eventType": "pod_created_event"}"#).unwrap_err();
        assert_matches!(err, EventsError::UnknownEvent { ref tag } if tag == "pod_created_event");
    }

    #[test]
    fn shape_mismatch_names_kind() {
        let err = decode(r#"{"eventType": "app_terminated_event", "appId": 42}"#).unwrap_err();
        assert_matches!(err, EventsError::Payload { kind: EventKind::AppTerminated, .. });
    }
}
