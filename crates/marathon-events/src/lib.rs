//! # marathon-events
//!
//! Subscribe to a Marathon cluster's event bus and fan typed events out to
//! in-process listeners.
//!
//! - [`EventHub`]: attach/detach listeners with an event-kind bitmask filter
//! - Callback transport: the cluster POSTs to a local HTTP endpoint at
//!   [`CALLBACK_PATH`]
//! - Event stream transport: a supervised SSE connection with member
//!   failover and fixed-interval reconnects ([`ReconnectPolicy`])
//! - [`decoder`]: `eventType` envelope → typed [`marathon_core::Event`]
//! - [`cluster`]: the HTTP request layer and the seams the transports use
//!
//! The transport is chosen by [`marathon_settings::EventsSettings::transport`]
//! and brought up lazily by the first attached listener.

#![deny(unsafe_code)]

pub mod cluster;
pub mod decoder;
pub mod errors;
pub mod hub;
pub mod interface;
pub mod metrics;
pub mod policy;
mod pull;
mod push;
mod registry;

#[cfg(test)]
mod testing;

pub use cluster::{ClusterClient, Member, StreamSource, SubscriptionApi, Subscriptions};
pub use errors::{ClusterError, EventsError, HandshakeError, StreamError};
pub use hub::{EventHub, Transport};
pub use policy::ReconnectPolicy;
pub use push::CALLBACK_PATH;
pub use registry::{EventsListener, ListenerId};
