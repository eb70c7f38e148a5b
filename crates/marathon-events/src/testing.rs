//! In-memory cluster double for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use marathon_settings::EventsSettings;
use parking_lot::Mutex;
use reqwest::Method;
use tokio::time::Instant;

use crate::cluster::{
    EVENTS_PATH, FrameStream, Member, StreamRequest, StreamSource, SubscriptionApi, Subscriptions,
};
use crate::errors::{ClusterError, HandshakeError, StreamError};

/// Settings bound to loopback on an ephemeral port.
pub(crate) fn events_settings(transport: &str) -> EventsSettings {
    EventsSettings {
        transport: transport.to_string(),
        interface: "127.0.0.1".to_string(),
        port: 0,
        ..EventsSettings::default()
    }
}

/// One scripted connection attempt.
pub(crate) enum Step {
    /// `stream_request` fails with no available member.
    Unavailable,
    /// `stream_request` fails structurally.
    Structural,
    /// `open` is rejected by the member.
    Reject,
    /// `open` succeeds; the stream yields these frames then stays open.
    Stream(Vec<Result<String, StreamError>>),
    /// `open` succeeds; the stream yields these frames then ends.
    Closing(Vec<Result<String, StreamError>>),
}

pub(crate) struct FakeCluster {
    pub(crate) registered: Mutex<Vec<String>>,
    pub(crate) subscribe_calls: Mutex<Vec<String>>,
    pub(crate) unsubscribe_calls: Mutex<Vec<String>>,
    pub(crate) requests: Mutex<Vec<(Member, Instant)>>,
    pub(crate) marked_down: Mutex<Vec<Member>>,
    script: Mutex<VecDeque<Step>>,
}

impl FakeCluster {
    pub(crate) fn new() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub(crate) fn scripted(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            registered: Mutex::new(Vec::new()),
            subscribe_calls: Mutex::new(Vec::new()),
            unsubscribe_calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            marked_down: Mutex::new(Vec::new()),
            script: Mutex::new(steps.into()),
        })
    }

    pub(crate) fn request_times(&self) -> Vec<Instant> {
        self.requests.lock().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl SubscriptionApi for FakeCluster {
    async fn subscriptions(&self) -> Result<Subscriptions, ClusterError> {
        Ok(Subscriptions {
            callback_urls: self.registered.lock().clone(),
        })
    }

    async fn subscribe(&self, callback: &str) -> Result<(), ClusterError> {
        self.subscribe_calls.lock().push(callback.to_string());
        let mut registered = self.registered.lock();
        if !registered.iter().any(|url| url == callback) {
            registered.push(callback.to_string());
        }
        Ok(())
    }

    async fn unsubscribe(&self, callback: &str) -> Result<(), ClusterError> {
        self.unsubscribe_calls.lock().push(callback.to_string());
        self.registered.lock().retain(|url| url != callback);
        Ok(())
    }
}

#[async_trait]
impl StreamSource for FakeCluster {
    fn stream_request(&self) -> Result<StreamRequest, ClusterError> {
        let mut script = self.script.lock();
        let mut requests = self.requests.lock();
        let member = Member::new(format!("http://m{}:8080", requests.len() + 1));
        requests.push((member.clone(), Instant::now()));

        match script.front() {
            None | Some(Step::Unavailable) => {
                let _ = script.pop_front();
                Err(ClusterError::NoAvailableMember)
            }
            Some(Step::Structural) => {
                let _ = script.pop_front();
                Err(ClusterError::RequestBuild {
                    reason: "relative URL without a base".into(),
                })
            }
            Some(_) => {
                let url = reqwest::Url::parse(&member.url(EVENTS_PATH))
                    .expect("scripted member URL is valid");
                Ok(StreamRequest {
                    member,
                    request: reqwest::Request::new(Method::GET, url),
                })
            }
        }
    }

    async fn open(&self, request: StreamRequest) -> Result<FrameStream, HandshakeError> {
        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Stream(frames)) => Ok(Box::pin(stream::iter(frames).chain(stream::pending()))),
            Some(Step::Closing(frames)) => Ok(Box::pin(stream::iter(frames))),
            _ => Err(HandshakeError::Status {
                member: request.member.to_string(),
                status: 503,
            }),
        }
    }

    fn mark_down(&self, member: &Member) {
        self.marked_down.lock().push(member.clone());
    }
}
