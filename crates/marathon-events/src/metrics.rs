//! Metric names recorded through the `metrics` facade.
//!
//! No recorder is installed here; embedding applications choose one.

/// Events received by a transport (counter, labels: transport).
pub const EVENTS_RECEIVED_TOTAL: &str = "marathon_events_received_total";
/// Events dropped during decoding (counter, labels: transport, reason).
pub const EVENT_DECODE_FAILURES_TOTAL: &str = "marathon_event_decode_failures_total";
/// Deliveries started towards listeners (counter).
pub const EVENT_DELIVERIES_TOTAL: &str = "marathon_event_deliveries_total";
/// Active listeners (gauge).
pub const LISTENERS_ACTIVE: &str = "marathon_listeners_active";
/// Callback requests received (counter).
pub const CALLBACK_REQUESTS_TOTAL: &str = "marathon_callback_requests_total";
/// Callback server restarts after an unexpected exit (counter).
pub const CALLBACK_SERVER_RESTARTS_TOTAL: &str = "marathon_callback_server_restarts_total";
/// Event stream connect failures followed by a backoff wait (counter).
pub const STREAM_CONNECT_FAILURES_TOTAL: &str = "marathon_stream_connect_failures_total";
/// Event stream handshakes rejected by a member (counter).
pub const STREAM_HANDSHAKE_FAILURES_TOTAL: &str = "marathon_stream_handshake_failures_total";
/// Established event streams that later terminated (counter).
pub const STREAM_DISCONNECTS_TOTAL: &str = "marathon_stream_disconnects_total";
/// Members taken out of rotation (counter).
pub const MEMBER_DOWN_TOTAL: &str = "marathon_member_down_total";
/// Members currently in rotation (gauge).
pub const MEMBERS_UP: &str = "marathon_members_up";
