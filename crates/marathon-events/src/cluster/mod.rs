//! Cluster request layer.
//!
//! The engine talks to the cluster through two seams:
//!
//! - [`SubscriptionApi`]: list/register/remove callback subscriptions
//! - [`StreamSource`]: build, open, and fail over event stream requests
//!
//! [`ClusterClient`] implements both over `reqwest`, with [`Members`]
//! tracking which cluster members are currently usable.

mod client;
mod members;

pub use client::ClusterClient;
pub use members::{Member, Members};

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::{ClusterError, HandshakeError, StreamError};

/// Callback subscription endpoint.
pub const SUBSCRIPTIONS_PATH: &str = "/v2/eventSubscriptions";
/// Event stream endpoint.
pub const EVENTS_PATH: &str = "/v2/events";
/// Member liveness endpoint used by the down-member probe.
pub const PING_PATH: &str = "/ping";

/// Data payloads of an open event stream, one item per SSE frame.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

/// Registered callback URLs as reported by the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriptions {
    /// Every callback URL the cluster currently delivers to.
    #[serde(default)]
    pub callback_urls: Vec<String>,
}

impl Subscriptions {
    /// Whether `callback` is registered (exact match).
    pub fn contains(&self, callback: &str) -> bool {
        self.callback_urls.iter().any(|url| url == callback)
    }
}

/// An event stream request bound to the member it targets.
#[derive(Debug)]
pub struct StreamRequest {
    /// Member the request is addressed to.
    pub member: Member,
    /// Ready-to-send request.
    pub request: reqwest::Request,
}

/// Callback subscription management.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Current callback subscriptions.
    async fn subscriptions(&self) -> Result<Subscriptions, ClusterError>;
    /// Register `callback` with the cluster.
    async fn subscribe(&self, callback: &str) -> Result<(), ClusterError>;
    /// Remove `callback` from the cluster.
    async fn unsubscribe(&self, callback: &str) -> Result<(), ClusterError>;
}

/// Event stream connection primitives used by the pull transport.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Build a stream request against the currently selected member.
    ///
    /// [`ClusterError::RequestBuild`] is structural; anything else (notably
    /// [`ClusterError::NoAvailableMember`]) is transient.
    fn stream_request(&self) -> Result<StreamRequest, ClusterError>;

    /// Send the request and hand back the frame stream once the member accepts it.
    async fn open(&self, request: StreamRequest) -> Result<FrameStream, HandshakeError>;

    /// Take `member` out of rotation so the next request selects another one.
    fn mark_down(&self, member: &Member);
}
