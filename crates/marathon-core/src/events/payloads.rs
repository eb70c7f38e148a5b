//! Typed payloads for each Marathon event kind.
//!
//! Field names follow the Marathon wire format (camelCase). Fields Marathon
//! always sends are required so a payload that does not match its declared
//! `eventType` fails to decode; everything else defaults when absent.
//! Nested API resources (application definitions, deployment plans) are kept
//! as raw JSON since their schemas belong to the request/response layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `api_post_event`: an application definition was changed through the REST API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPostEvent {
    /// Wire tag.
    pub event_type: String,
    /// Address of the API caller.
    #[serde(default)]
    pub client_ip: String,
    /// Event time (ISO-8601 string as sent).
    #[serde(default)]
    pub timestamp: String,
    /// Request URI.
    pub uri: String,
    /// The posted application definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_definition: Option<Value>,
}

/// Task address reported with a status update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    /// Address string.
    pub ip_address: String,
    /// `IPv4` or `IPv6`.
    #[serde(default)]
    pub protocol: String,
}

/// `status_update_event`: a task changed state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateEvent {
    /// Wire tag.
    pub event_type: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
    /// Agent the task runs on.
    #[serde(default)]
    pub slave_id: String,
    /// Task identifier.
    pub task_id: String,
    /// Mesos task state, e.g. `TASK_RUNNING`.
    pub task_status: String,
    /// Optional status message.
    #[serde(default)]
    pub message: String,
    /// Owning application.
    pub app_id: String,
    /// Agent host name.
    #[serde(default)]
    pub host: String,
    /// Host ports assigned to the task.
    #[serde(default)]
    pub ports: Vec<u16>,
    /// Task addresses.
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
    /// Application version the task runs.
    #[serde(default)]
    pub version: String,
}

/// `framework_message_event`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkMessageEvent {
    /// Wire tag.
    pub event_type: String,
    /// Executor that sent the message.
    pub executor_id: String,
    /// Message body.
    #[serde(default)]
    pub message: String,
    /// Originating agent.
    #[serde(default)]
    pub slave_id: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
}

/// `subscribe_event` / `unsubscribe_event`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEvent {
    /// Wire tag.
    pub event_type: String,
    /// Callback URL that was (un)registered.
    pub callback_url: String,
    /// Address of the caller.
    #[serde(default)]
    pub client_ip: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
}

/// `event_stream_attached` / `event_stream_detached`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStreamEvent {
    /// Wire tag.
    pub event_type: String,
    /// Remote end of the event stream.
    pub remote_address: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
}

/// Health check definition carried by health check events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckDefinition {
    /// Grace period before failures count.
    pub grace_period_seconds: f64,
    /// Interval between checks.
    pub interval_seconds: f64,
    /// Failures before the task is killed.
    pub max_consecutive_failures: f64,
    /// HTTP path for HTTP checks.
    pub path: String,
    /// Port index the check targets.
    pub port_index: f64,
    /// `HTTP`, `TCP`, `COMMAND`, ...
    pub protocol: String,
    /// Per-check timeout.
    pub timeout_seconds: f64,
}

/// `add_health_check_event` / `remove_health_check_event` / `failed_health_check_event`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckEvent {
    /// Wire tag.
    pub event_type: String,
    /// Application the check belongs to.
    pub app_id: String,
    /// Failing task, only present on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// The check definition.
    #[serde(default)]
    pub health_check: HealthCheckDefinition,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
}

/// `health_status_changed_event`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatusChangedEvent {
    /// Wire tag.
    pub event_type: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
    /// Application.
    pub app_id: String,
    /// Task (Marathon < 1.4).
    #[serde(default)]
    pub task_id: String,
    /// Instance (Marathon >= 1.4).
    #[serde(default)]
    pub instance_id: String,
    /// Application version.
    #[serde(default)]
    pub version: String,
    /// New health state.
    pub alive: bool,
}

/// `group_change_success` / `group_change_failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChangeEvent {
    /// Wire tag.
    pub event_type: String,
    /// Changed group.
    pub group_id: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
    /// Group version.
    #[serde(default)]
    pub version: String,
    /// Failure reason, only on `group_change_failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `deployment_success` / `deployment_failed`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    /// Wire tag.
    pub event_type: String,
    /// Deployment identifier.
    pub id: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
    /// Deployment plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
}

/// `deployment_info` / `deployment_step_success` / `deployment_step_failure`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStepEvent {
    /// Wire tag.
    pub event_type: String,
    /// Step being reported.
    pub current_step: Value,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
    /// Deployment plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
}

/// `app_terminated_event`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTerminatedEvent {
    /// Wire tag.
    pub event_type: String,
    /// Event time.
    #[serde(default)]
    pub timestamp: String,
    /// Terminated application.
    pub app_id: String,
}
