//! `reqwest`-backed cluster client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{StreamExt, future};
use marathon_settings::ClusterSettings;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    EVENTS_PATH, FrameStream, Member, Members, PING_PATH, SUBSCRIPTIONS_PATH, StreamRequest,
    StreamSource, SubscriptionApi, Subscriptions,
};
use crate::errors::{ClusterError, HandshakeError, StreamError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const APPLICATION_JSON: &str = "application/json";
const TEXT_EVENT_STREAM: &str = "text/event-stream";

#[derive(Clone, Default)]
struct Credentials {
    basic: Option<(String, Option<String>)>,
    token: Option<String>,
}

impl Credentials {
    fn from_settings(settings: &ClusterSettings) -> Self {
        Self {
            basic: settings
                .http_basic_auth_user
                .clone()
                .map(|user| (user, settings.http_basic_password.clone())),
            token: settings.dcos_token.clone(),
        }
    }

    fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some((user, password)) = &self.basic {
            builder = builder.basic_auth(user, password.as_ref());
        }
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("token={token}"));
        }
        builder
    }
}

/// Cluster client over HTTP.
///
/// Request/response calls share one client with the configured timeout;
/// the event stream uses a second client with none, since the stream is
/// expected to stay open indefinitely. Members that fail at the connection
/// level are marked down and probed on `/ping` until they answer again.
pub struct ClusterClient {
    members: Arc<Members>,
    http: Client,
    stream_http: Client,
    credentials: Credentials,
    polling_wait: Duration,
    shutdown: CancellationToken,
}

impl ClusterClient {
    /// Build a client for the members listed in `settings.url`.
    pub fn new(settings: &ClusterSettings) -> Result<Self, ClusterError> {
        let urls = settings.members();
        if urls.is_empty() {
            return Err(ClusterError::InvalidConfig {
                reason: "no member URLs configured".into(),
            });
        }
        for raw in &urls {
            let parsed = url::Url::parse(raw).map_err(|e| ClusterError::InvalidConfig {
                reason: format!("invalid member URL '{raw}': {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ClusterError::InvalidConfig {
                    reason: format!("member URL '{raw}' must use http or https"),
                });
            }
        }

        let mut api_builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if settings.request_timeout_ms > 0 {
            api_builder = api_builder.timeout(Duration::from_millis(settings.request_timeout_ms));
        }
        let http = api_builder.build().map_err(|e| ClusterError::InvalidConfig {
            reason: format!("failed to build HTTP client: {e}"),
        })?;
        let stream_http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::InvalidConfig {
                reason: format!("failed to build event stream client: {e}"),
            })?;

        Ok(Self {
            members: Arc::new(Members::new(urls)),
            http,
            stream_http,
            credentials: Credentials::from_settings(settings),
            polling_wait: Duration::from_millis(settings.polling_wait_time_ms.max(1)),
            shutdown: CancellationToken::new(),
        })
    }

    /// Member availability.
    pub fn members(&self) -> &Members {
        &self.members
    }

    fn build(
        &self,
        client: &Client,
        member: &Member,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        accept: &str,
    ) -> Result<Request, ClusterError> {
        let mut builder = client.request(method, member.url(path)).header(ACCEPT, accept);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.credentials
            .apply(builder)
            .build()
            .map_err(|e| ClusterError::RequestBuild {
                reason: e.to_string(),
            })
    }

    /// Issue an API call, failing over across members on connection errors.
    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Bytes, ClusterError> {
        loop {
            let member = self.members.next()?;
            let request = self.build(&self.http, &member, method.clone(), path, query, APPLICATION_JSON)?;

            let response = match self.http.execute(request).await {
                Ok(response) => response,
                Err(source) if source.is_connect() || source.is_timeout() => {
                    debug!(%member, %method, path, error = %source, "cluster request failed, trying next member");
                    self.take_down(&member);
                    continue;
                }
                Err(source) => {
                    return Err(ClusterError::Http {
                        member: member.to_string(),
                        source,
                    });
                }
            };

            let status = response.status();
            let body = response.bytes().await.map_err(|source| ClusterError::Http {
                member: member.to_string(),
                source,
            })?;
            if !status.is_success() {
                return Err(ClusterError::Status {
                    method: method.to_string(),
                    path: path.to_string(),
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                });
            }
            return Ok(body);
        }
    }

    fn take_down(&self, member: &Member) {
        if !self.members.mark_down(member) {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(%member, "no runtime available, member will not be probed");
            return;
        }
        let _ = tokio::spawn(probe_member(
            self.http.clone(),
            self.credentials.clone(),
            Arc::clone(&self.members),
            member.clone(),
            self.polling_wait,
            self.shutdown.child_token(),
        ));
    }
}

impl Drop for ClusterClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Poll `member`'s ping endpoint until it answers, then mark it up.
async fn probe_member(
    http: Client,
    credentials: Credentials,
    members: Arc<Members>,
    member: Member,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }
        let request = credentials.apply(http.get(member.url(PING_PATH)));
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let _ = members.mark_up(&member);
                return;
            }
            Ok(response) => debug!(%member, status = %response.status(), "member still unhealthy"),
            Err(e) => debug!(%member, error = %e, "member still unreachable"),
        }
    }
}

#[async_trait]
impl SubscriptionApi for ClusterClient {
    async fn subscriptions(&self) -> Result<Subscriptions, ClusterError> {
        let body = self.call(Method::GET, SUBSCRIPTIONS_PATH, &[]).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn subscribe(&self, callback: &str) -> Result<(), ClusterError> {
        let _ = self
            .call(Method::POST, SUBSCRIPTIONS_PATH, &[("callbackUrl", callback)])
            .await?;
        Ok(())
    }

    async fn unsubscribe(&self, callback: &str) -> Result<(), ClusterError> {
        let _ = self
            .call(Method::DELETE, SUBSCRIPTIONS_PATH, &[("callbackUrl", callback)])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StreamSource for ClusterClient {
    fn stream_request(&self) -> Result<StreamRequest, ClusterError> {
        let member = self.members.next()?;
        let request = self.build(
            &self.stream_http,
            &member,
            Method::GET,
            EVENTS_PATH,
            &[],
            TEXT_EVENT_STREAM,
        )?;
        Ok(StreamRequest { member, request })
    }

    async fn open(&self, request: StreamRequest) -> Result<FrameStream, HandshakeError> {
        let StreamRequest { member, request } = request;
        let response = self
            .stream_http
            .execute(request)
            .await
            .map_err(|source| HandshakeError::Http {
                member: member.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandshakeError::Status {
                member: member.to_string(),
                status: status.as_u16(),
            });
        }

        let frames = response
            .bytes_stream()
            .eventsource()
            .filter_map(|item| {
                future::ready(match item {
                    Ok(event) if event.data.is_empty() => None,
                    Ok(event) => Some(Ok(event.data)),
                    Err(e) => Some(Err(StreamError::Read(e.to_string()))),
                })
            });
        Ok(Box::pin(frames))
    }

    fn mark_down(&self, member: &Member) {
        self.take_down(member);
    }
}
