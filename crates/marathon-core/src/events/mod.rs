//! Marathon event catalog.
//!
//! Every event Marathon publishes carries an `eventType` tag. [`EventKind`]
//! is the closed set of tags this client understands; each kind owns a
//! stable identity bit (used by listener filter masks) and knows which
//! payload struct its JSON decodes into.
//!
//! ```text
//! "status_update_event" ──from_tag──▶ EventKind::StatusUpdate ──id──▶ 1 << 1
//!                                            │
//!                                          decode
//!                                            ▼
//!                              EventPayload::StatusUpdate(..)
//! ```

pub mod payloads;

use serde::Serialize;
use thiserror::Error;

pub use payloads::{
    ApiPostEvent, AppTerminatedEvent, DeploymentEvent, DeploymentStepEvent, EventStreamEvent,
    FrameworkMessageEvent, GroupChangeEvent, HealthCheckDefinition, HealthCheckEvent,
    HealthStatusChangedEvent, IpAddress, StatusUpdateEvent, SubscriptionEvent,
};

/// Catalog lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The wire tag names no known event kind.
    #[error("the event type '{tag}' is not supported")]
    UnknownEvent {
        /// Tag as received.
        tag: String,
    },
}

/// A Marathon event kind.
///
/// Declaration order fixes the identity bits; append new kinds at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `api_post_event`
    ApiRequest,
    /// `status_update_event`
    StatusUpdate,
    /// `framework_message_event`
    FrameworkMessage,
    /// `subscribe_event`
    Subscription,
    /// `unsubscribe_event`
    Unsubscription,
    /// `event_stream_attached`
    StreamAttached,
    /// `event_stream_detached`
    StreamDetached,
    /// `add_health_check_event`
    AddHealthCheck,
    /// `remove_health_check_event`
    RemoveHealthCheck,
    /// `failed_health_check_event`
    FailedHealthCheck,
    /// `health_status_changed_event`
    ChangedHealthCheck,
    /// `group_change_success`
    GroupChangeSuccess,
    /// `group_change_failed`
    GroupChangeFailed,
    /// `deployment_success`
    DeploymentSuccess,
    /// `deployment_failed`
    DeploymentFailed,
    /// `deployment_info`
    DeploymentInfo,
    /// `deployment_step_success`
    DeploymentStepSuccess,
    /// `deployment_step_failure`
    DeploymentStepFailure,
    /// `app_terminated_event`
    AppTerminated,
}

/// Application-level events: task status, health changes, termination.
pub const EVENT_ID_APPLICATIONS: u32 = EventKind::StatusUpdate.id()
    | EventKind::ChangedHealthCheck.id()
    | EventKind::FailedHealthCheck.id()
    | EventKind::AppTerminated.id();

/// Subscription bookkeeping events.
pub const EVENT_ID_SUBSCRIPTIONS: u32 = EventKind::Subscription.id()
    | EventKind::Unsubscription.id()
    | EventKind::StreamAttached.id()
    | EventKind::StreamDetached.id();

/// Every known event kind.
pub const EVENT_ID_ALL: u32 = (1 << EventKind::ALL.len()) - 1;

impl EventKind {
    /// All kinds in identity-bit order.
    pub const ALL: [EventKind; 19] = [
        Self::ApiRequest,
        Self::StatusUpdate,
        Self::FrameworkMessage,
        Self::Subscription,
        Self::Unsubscription,
        Self::StreamAttached,
        Self::StreamDetached,
        Self::AddHealthCheck,
        Self::RemoveHealthCheck,
        Self::FailedHealthCheck,
        Self::ChangedHealthCheck,
        Self::GroupChangeSuccess,
        Self::GroupChangeFailed,
        Self::DeploymentSuccess,
        Self::DeploymentFailed,
        Self::DeploymentInfo,
        Self::DeploymentStepSuccess,
        Self::DeploymentStepFailure,
        Self::AppTerminated,
    ];

    /// Stable identity bit for filter masks.
    pub const fn id(self) -> u32 {
        1 << (self as u32)
    }

    /// Wire tag carried in the `eventType` field.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ApiRequest => "api_post_event",
            Self::StatusUpdate => "status_update_event",
            Self::FrameworkMessage => "framework_message_event",
            Self::Subscription => "subscribe_event",
            Self::Unsubscription => "unsubscribe_event",
            Self::StreamAttached => "event_stream_attached",
            Self::StreamDetached => "event_stream_detached",
            Self::AddHealthCheck => "add_health_check_event",
            Self::RemoveHealthCheck => "remove_health_check_event",
            Self::FailedHealthCheck => "failed_health_check_event",
            Self::ChangedHealthCheck => "health_status_changed_event",
            Self::GroupChangeSuccess => "group_change_success",
            Self::GroupChangeFailed => "group_change_failed",
            Self::DeploymentSuccess => "deployment_success",
            Self::DeploymentFailed => "deployment_failed",
            Self::DeploymentInfo => "deployment_info",
            Self::DeploymentStepSuccess => "deployment_step_success",
            Self::DeploymentStepFailure => "deployment_step_failure",
            Self::AppTerminated => "app_terminated_event",
        }
    }

    /// Look up the kind for a wire tag.
    pub fn from_tag(tag: &str) -> Result<Self, CatalogError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| CatalogError::UnknownEvent {
                tag: tag.to_string(),
            })
    }

    /// Parse the full JSON payload into this kind's typed struct.
    pub fn decode(self, raw: &str) -> Result<EventPayload, serde_json::Error> {
        Ok(match self {
            Self::ApiRequest => EventPayload::ApiPost(serde_json::from_str(raw)?),
            Self::StatusUpdate => EventPayload::StatusUpdate(serde_json::from_str(raw)?),
            Self::FrameworkMessage => EventPayload::FrameworkMessage(serde_json::from_str(raw)?),
            Self::Subscription | Self::Unsubscription => {
                EventPayload::Subscription(serde_json::from_str(raw)?)
            }
            Self::StreamAttached | Self::StreamDetached => {
                EventPayload::EventStream(serde_json::from_str(raw)?)
            }
            Self::AddHealthCheck | Self::RemoveHealthCheck | Self::FailedHealthCheck => {
                EventPayload::HealthCheck(serde_json::from_str(raw)?)
            }
            Self::ChangedHealthCheck => {
                EventPayload::HealthStatusChanged(serde_json::from_str(raw)?)
            }
            Self::GroupChangeSuccess | Self::GroupChangeFailed => {
                EventPayload::GroupChange(serde_json::from_str(raw)?)
            }
            Self::DeploymentSuccess | Self::DeploymentFailed => {
                EventPayload::Deployment(serde_json::from_str(raw)?)
            }
            Self::DeploymentInfo | Self::DeploymentStepSuccess | Self::DeploymentStepFailure => {
                EventPayload::DeploymentStep(serde_json::from_str(raw)?)
            }
            Self::AppTerminated => EventPayload::AppTerminated(serde_json::from_str(raw)?),
        })
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Decoded payload, one variant per payload shape.
///
/// Serializes back to the Marathon wire form (the inner struct keeps `eventType`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// See [`ApiPostEvent`].
    ApiPost(ApiPostEvent),
    /// See [`StatusUpdateEvent`].
    StatusUpdate(StatusUpdateEvent),
    /// See [`FrameworkMessageEvent`].
    FrameworkMessage(FrameworkMessageEvent),
    /// See [`SubscriptionEvent`].
    Subscription(SubscriptionEvent),
    /// See [`EventStreamEvent`].
    EventStream(EventStreamEvent),
    /// See [`HealthCheckEvent`].
    HealthCheck(HealthCheckEvent),
    /// See [`HealthStatusChangedEvent`].
    HealthStatusChanged(HealthStatusChangedEvent),
    /// See [`GroupChangeEvent`].
    GroupChange(GroupChangeEvent),
    /// See [`DeploymentEvent`].
    Deployment(DeploymentEvent),
    /// See [`DeploymentStepEvent`].
    DeploymentStep(DeploymentStepEvent),
    /// See [`AppTerminatedEvent`].
    AppTerminated(AppTerminatedEvent),
}

/// A decoded, identified event. Transient: built per received payload and
/// shared (behind an `Arc`) by every listener it is delivered to.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Kind resolved from the wire tag.
    pub kind: EventKind,
    /// Typed payload.
    pub payload: EventPayload,
}

impl Event {
    /// Identity bit of this event.
    pub fn id(&self) -> u32 {
        self.kind.id()
    }

    /// Whether a listener with `filter` wants this event.
    pub fn matches(&self, filter: u32) -> bool {
        filter & self.id() != 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
