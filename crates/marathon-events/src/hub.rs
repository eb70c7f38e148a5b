//! The event hub: listener attach/detach, transport selection, dispatch.
//!
//! One hub owns one listener registry and at most one running transport.
//! The registry and transport state sit behind a single `RwLock`:
//! attach/detach take it exclusively (so transport setup happens once even
//! under concurrent attaches), dispatch takes it shared.
//!
//! Dropping the hub stops the callback server, the event stream
//! supervisor, and any member probes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use marathon_settings::{EventsSettings, MarathonSettings, TRANSPORT_CALLBACK, TRANSPORT_SSE};
use metrics::counter;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::cluster::{ClusterClient, StreamSource, SubscriptionApi, Subscriptions};
use crate::decoder;
use crate::errors::EventsError;
use crate::metrics::{EVENT_DECODE_FAILURES_TOTAL, EVENTS_RECEIVED_TOTAL};
use crate::policy::ReconnectPolicy;
use crate::pull;
use crate::push::PushState;
use crate::registry::{EventsListener, ListenerId, ListenerRegistry};

/// Event delivery mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// The cluster POSTs events to a local HTTP endpoint.
    Callback,
    /// This process holds a server-sent events stream open against the cluster.
    Sse,
}

impl Transport {
    /// Configuration identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Callback => TRANSPORT_CALLBACK,
            Self::Sse => TRANSPORT_SSE,
        }
    }
}

impl FromStr for Transport {
    type Err = EventsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TRANSPORT_CALLBACK => Ok(Self::Callback),
            TRANSPORT_SSE => Ok(Self::Sse),
            other => Err(EventsError::Configuration {
                transport: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) struct HubState {
    pub(crate) listeners: ListenerRegistry,
    pub(crate) active: Option<Transport>,
    pub(crate) push: PushState,
    pub(crate) pull_started: bool,
}

/// State shared between the hub handle and its background tasks.
pub(crate) struct HubShared {
    pub(crate) settings: EventsSettings,
    pub(crate) subscriptions: Arc<dyn SubscriptionApi>,
    pub(crate) streams: Arc<dyn StreamSource>,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) shutdown: CancellationToken,
    pub(crate) state: RwLock<HubState>,
}

impl HubShared {
    /// Decode `raw` and fan it out to every matching listener.
    ///
    /// Returns the number of listeners the event was handed to.
    pub(crate) async fn handle_event(
        &self,
        raw: &str,
        transport: &'static str,
    ) -> Result<usize, EventsError> {
        counter!(EVENTS_RECEIVED_TOTAL, "transport" => transport).increment(1);

        let event = match decoder::decode(raw) {
            Ok(event) => Arc::new(event),
            Err(e) => {
                let reason = match &e {
                    EventsError::UnknownEvent { .. } => "unknown_event",
                    EventsError::Payload { .. } => "payload",
                    _ => "envelope",
                };
                counter!(EVENT_DECODE_FAILURES_TOTAL, "transport" => transport, "reason" => reason)
                    .increment(1);
                return Err(e);
            }
        };

        let deliveries = self.state.read().await.listeners.dispatch(&event);
        trace!(event = %event.kind, deliveries, transport, "event dispatched");
        Ok(deliveries)
    }
}

/// Marathon event subscription hub.
///
/// ```ignore
/// let hub = EventHub::new(&settings)?;
/// let mut listener = hub
///     .add_events_listener(EventKind::StatusUpdate.id() | EVENT_ID_SUBSCRIPTIONS)
///     .await?;
/// while let Some(event) = listener.recv().await {
///     println!("{}", event.kind);
/// }
/// ```
pub struct EventHub {
    shared: Arc<HubShared>,
}

impl EventHub {
    /// Hub talking to the cluster described by `settings`.
    pub fn new(settings: &MarathonSettings) -> Result<Self, EventsError> {
        let client = Arc::new(ClusterClient::new(&settings.cluster)?);
        Ok(Self::with_cluster(settings.events.clone(), client))
    }

    /// Hub over a single cluster implementation serving both seams.
    pub fn with_cluster<C>(settings: EventsSettings, cluster: Arc<C>) -> Self
    where
        C: SubscriptionApi + StreamSource + 'static,
    {
        let subscriptions: Arc<dyn SubscriptionApi> = Arc::clone(&cluster) as _;
        let streams: Arc<dyn StreamSource> = cluster;
        Self::with_sources(settings, subscriptions, streams)
    }

    /// Hub over separate subscription and stream implementations.
    pub fn with_sources(
        settings: EventsSettings,
        subscriptions: Arc<dyn SubscriptionApi>,
        streams: Arc<dyn StreamSource>,
    ) -> Self {
        let policy = ReconnectPolicy::from_millis(settings.reconnect_interval_ms);
        let state = HubState {
            listeners: ListenerRegistry::new(settings.listener_buffer),
            active: None,
            push: PushState::default(),
            pull_started: false,
        };
        Self {
            shared: Arc::new(HubShared {
                settings,
                subscriptions,
                streams,
                policy,
                shutdown: CancellationToken::new(),
                state: RwLock::new(state),
            }),
        }
    }

    /// Attach a listener for the event kinds whose identity bits are set in `filter`.
    ///
    /// The first attach brings up the configured transport: the callback
    /// server is bound and registered with the cluster, or the event stream
    /// supervisor is started. Later attaches reuse it. If callback
    /// registration fails it is retried on the next attach, without rebinding.
    ///
    /// # Errors
    ///
    /// - [`EventsError::Configuration`] for an unsupported transport identifier
    /// - [`EventsError::Interface`] / [`EventsError::Bind`] when the callback server cannot start
    /// - [`EventsError::Cluster`] when callback registration fails
    ///
    /// No listener is registered when an error is returned.
    pub async fn add_events_listener(&self, filter: u32) -> Result<EventsListener, EventsError> {
        let transport = Transport::from_str(&self.shared.settings.transport)?;
        let mut state = self.shared.state.write().await;

        match transport {
            Transport::Callback => state.push.ensure_registered(&self.shared).await?,
            Transport::Sse if !state.pull_started => {
                pull::spawn(Arc::clone(&self.shared));
                state.pull_started = true;
                info!("event stream supervisor started");
            }
            Transport::Sse => {}
        }
        state.active = Some(transport);

        Ok(state.listeners.add(filter))
    }

    /// Detach a listener. Returns `false` if `id` was not attached.
    ///
    /// When the last listener leaves the callback transport, the callback is
    /// unregistered from the cluster (failures are logged). The callback
    /// server itself keeps running.
    pub async fn remove_events_listener(&self, id: ListenerId) -> bool {
        let mut state = self.shared.state.write().await;
        if !state.listeners.remove(id) {
            debug!(listener = %id, "remove requested for unknown listener");
            return false;
        }
        if state.active == Some(Transport::Callback) && state.listeners.is_empty() {
            state.push.unregister(&self.shared).await;
        }
        true
    }

    /// Number of attached listeners.
    pub async fn listener_count(&self) -> usize {
        self.shared.state.read().await.listeners.len()
    }

    /// URL the cluster delivers callbacks to.
    ///
    /// `None` until the callback server is bound, unless an override URL is configured.
    pub async fn subscription_url(&self) -> Option<String> {
        self.shared
            .state
            .read()
            .await
            .push
            .callback_url(&self.shared.settings)
    }

    /// Callback subscriptions registered with the cluster.
    pub async fn subscriptions(&self) -> Result<Subscriptions, EventsError> {
        Ok(self.shared.subscriptions.subscriptions().await?)
    }

    /// Register `callback` with the cluster.
    pub async fn subscribe(&self, callback: &str) -> Result<(), EventsError> {
        Ok(self.shared.subscriptions.subscribe(callback).await?)
    }

    /// Remove `callback` from the cluster.
    pub async fn unsubscribe(&self, callback: &str) -> Result<(), EventsError> {
        Ok(self.shared.subscriptions.unsubscribe(callback).await?)
    }

    /// Whether `callback` is registered with the cluster.
    pub async fn has_subscription(&self, callback: &str) -> Result<bool, EventsError> {
        Ok(self.subscriptions().await?.contains(callback))
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<HubShared> {
        &self.shared
    }
}

impl Drop for EventHub {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}
