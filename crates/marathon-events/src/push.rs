//! Callback transport: the cluster POSTs events to a local HTTP endpoint.
//!
//! The endpoint always answers 200, whatever it receives, so the cluster
//! never backs off or drops this subscriber because of one bad payload.
//! Problems with a request are logged and the request is discarded.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::any;
use marathon_settings::{EventsSettings, TRANSPORT_CALLBACK};
use metrics::counter;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use crate::errors::EventsError;
use crate::hub::HubShared;
use crate::interface::interface_address;
use crate::metrics::{CALLBACK_REQUESTS_TOTAL, CALLBACK_SERVER_RESTARTS_TOTAL};

/// Path the callback server accepts events on.
pub const CALLBACK_PATH: &str = "/event";

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug)]
struct BoundServer {
    advertised: IpAddr,
    local_addr: SocketAddr,
}

/// Callback transport lifecycle: bound once, registered whenever listeners exist.
#[derive(Default)]
pub(crate) struct PushState {
    bound: Option<BoundServer>,
    registered: bool,
}

impl PushState {
    /// URL the cluster should deliver to, if known yet.
    pub(crate) fn callback_url(&self, settings: &EventsSettings) -> Option<String> {
        match (&settings.callback_url, self.bound) {
            (Some(base), _) => Some(format!("{}{CALLBACK_PATH}", base.trim_end_matches('/'))),
            (None, Some(bound)) => Some(format!(
                "http://{}{CALLBACK_PATH}",
                SocketAddr::new(bound.advertised, bound.local_addr.port())
            )),
            (None, None) => None,
        }
    }

    /// Bind the callback server if needed, then make sure the cluster knows the callback URL.
    #[instrument(skip_all)]
    pub(crate) async fn ensure_registered(&mut self, hub: &Arc<HubShared>) -> Result<(), EventsError> {
        if self.bound.is_none() {
            self.bound = Some(bind(hub).await?);
        }
        if self.registered {
            return Ok(());
        }

        let Some(url) = self.callback_url(&hub.settings) else {
            return Ok(());
        };
        if hub.subscriptions.subscriptions().await?.contains(&url) {
            debug!(callback = %url, "callback already registered");
        } else {
            hub.subscriptions.subscribe(&url).await?;
            info!(callback = %url, "callback registered");
        }
        self.registered = true;
        Ok(())
    }

    /// Remove the callback from the cluster. Failures are logged, not returned.
    pub(crate) async fn unregister(&mut self, hub: &HubShared) {
        self.registered = false;
        let Some(url) = self.callback_url(&hub.settings) else {
            return;
        };
        match hub.subscriptions.unsubscribe(&url).await {
            Ok(()) => info!(callback = %url, "callback unregistered"),
            Err(e) => warn!(callback = %url, error = %e, "failed to unregister callback"),
        }
    }
}

#[instrument(skip_all, fields(interface = %hub.settings.interface, port = hub.settings.port))]
async fn bind(hub: &Arc<HubShared>) -> Result<BoundServer, EventsError> {
    let advertised = interface_address(&hub.settings.interface)?;
    let addr = SocketAddr::new(advertised, hub.settings.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| EventsError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| EventsError::Bind { addr, source })?;

    let _ = tokio::spawn(serve(
        Arc::new(listener),
        router(Arc::clone(hub)),
        hub.shutdown.clone(),
    ));
    info!(%local_addr, "callback server listening");

    Ok(BoundServer {
        advertised,
        local_addr,
    })
}

/// Callback router. Every method on [`CALLBACK_PATH`] is accepted.
pub(crate) fn router(hub: Arc<HubShared>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, any(intake))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

async fn intake(State(hub): State<Arc<HubShared>>, body: Body) -> StatusCode {
    counter!(CALLBACK_REQUESTS_TOTAL).increment(1);

    let bytes = match axum::body::to_bytes(body, hub.settings.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "failed to read callback body");
            return StatusCode::OK;
        }
    };
    if bytes.is_empty() {
        return StatusCode::OK;
    }

    let content = String::from_utf8_lossy(&bytes);
    match hub.handle_event(&content, TRANSPORT_CALLBACK).await {
        Ok(_) => {}
        Err(e) if e.is_decode_class() => debug!(error = %e, "dropped callback event"),
        Err(e) => warn!(error = %e, "failed to handle callback event"),
    }
    StatusCode::OK
}

/// Serve until shutdown, restarting over the same socket if the server ever exits.
async fn serve(listener: Arc<TcpListener>, router: Router, shutdown: CancellationToken) {
    loop {
        let result = axum::serve(SharedListener(Arc::clone(&listener)), router.clone())
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await;
        if shutdown.is_cancelled() {
            debug!("callback server stopped");
            return;
        }
        counter!(CALLBACK_SERVER_RESTARTS_TOTAL).increment(1);
        match result {
            Ok(()) => warn!("callback server exited, restarting"),
            Err(e) => warn!(error = %e, "callback server failed, restarting"),
        }
    }
}

/// Accept loop over a listener shared across server restarts.
struct SharedListener(Arc<TcpListener>);

impl axum::serve::Listener for SharedListener {
    type Io = TcpStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.0.accept().await {
                Ok(conn) => return conn,
                Err(e) => {
                    debug!(error = %e, "callback accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.0.local_addr()
    }
}
