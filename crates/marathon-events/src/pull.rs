//! Event stream transport: hold a server-sent events stream open against
//! the cluster and feed every frame to the dispatcher.
//!
//! A single supervisor task runs for the lifetime of the hub:
//!
//! 1. **connect**: build a request for the current member and open it. A
//!    rejected handshake marks that member down and retries at once; failing
//!    to build a request at all (no member left) backs off for the policy
//!    interval.
//! 2. **listen**: decode and dispatch frames in order until the stream errors
//!    or ends, then go back to connect.

use std::sync::Arc;

use futures::StreamExt;
use marathon_settings::TRANSPORT_SSE;
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::cluster::{FrameStream, StreamSource};
use crate::errors::{ClusterError, StreamError};
use crate::hub::HubShared;
use crate::metrics::{
    STREAM_CONNECT_FAILURES_TOTAL, STREAM_DISCONNECTS_TOTAL, STREAM_HANDSHAKE_FAILURES_TOTAL,
};

/// Start the supervisor. Stops when the hub shuts down.
pub(crate) fn spawn(hub: Arc<HubShared>) {
    let _ = tokio::spawn(supervise(hub));
}

async fn supervise(hub: Arc<HubShared>) {
    let shutdown = hub.shutdown.clone();
    let mut failures = 0u32;

    loop {
        let connected = tokio::select! {
            () = shutdown.cancelled() => break,
            result = connect(hub.streams.as_ref()) => result,
        };

        match connected {
            Ok(frames) => {
                failures = 0;
                info!("event stream connected");
                let reason = tokio::select! {
                    () = shutdown.cancelled() => break,
                    reason = listen(&hub, frames) => reason,
                };
                counter!(STREAM_DISCONNECTS_TOTAL).increment(1);
                warn!(error = %reason, "event stream terminated, reconnecting");
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = hub.policy.delay(failures);
                counter!(STREAM_CONNECT_FAILURES_TOTAL).increment(1);
                warn!(error = %e, attempt = failures, ?delay, "failed to connect to the event stream");
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
    debug!("event stream supervisor stopped");
}

/// Open an event stream, moving past members that reject the handshake.
///
/// # Panics
///
/// When a request cannot be built at all: that means the member list or
/// credentials are malformed, which no amount of retrying will fix.
pub(crate) async fn connect(source: &dyn StreamSource) -> Result<FrameStream, ClusterError> {
    loop {
        let request = match source.stream_request() {
            Ok(request) => request,
            Err(e) if e.is_structural() => {
                error!(error = %e, "unable to build an event stream request");
                panic!("event stream requests should never fail to be built: {e}");
            }
            Err(e) => return Err(e),
        };

        let member = request.member.clone();
        match source.open(request).await {
            Ok(frames) => {
                debug!(%member, "event stream handshake accepted");
                return Ok(frames);
            }
            Err(e) => {
                counter!(STREAM_HANDSHAKE_FAILURES_TOTAL).increment(1);
                debug!(%member, error = %e, "event stream handshake failed");
                source.mark_down(&member);
            }
        }
    }
}

/// Dispatch frames until the stream fails. Returns why it stopped.
async fn listen(hub: &HubShared, mut frames: FrameStream) -> StreamError {
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(data) if data.trim().is_empty() => {}
            Ok(data) => {
                match hub.handle_event(&data, TRANSPORT_SSE).await {
                    Ok(_) => {}
                    Err(e) if e.is_decode_class() => debug!(error = %e, "dropped event stream frame"),
                    Err(e) => warn!(error = %e, "failed to handle event stream frame"),
                }
            }
            Err(e) => return e,
        }
    }
    StreamError::Closed
}
