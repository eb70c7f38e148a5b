//! Listener registry and event fan-out.
//!
//! Each listener owns a bounded channel. Dispatch never waits on a
//! listener: while the channel has room events go straight into it, and
//! once it fills up they are queued on an unbounded backlog drained by a
//! single forwarding task per listener. Events reach a listener in the
//! order they were dispatched. The forwarder is tracked per listener and
//! gives up as soon as the listener is detached; the registry drops its
//! sender only after the forwarder has returned, so a receiver sees the
//! channel close cleanly and no delivery ever targets a closed channel.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use marathon_core::events::Event;
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::metrics::{EVENT_DELIVERIES_TOTAL, LISTENERS_ACTIVE};

/// Opaque listener identity, unique for the lifetime of a hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving side of a listener.
///
/// Yields every event whose identity bit is in [`Self::filter`], until the
/// listener is detached and its in-flight deliveries have settled, after
/// which [`Self::recv`] returns `None`.
#[derive(Debug)]
pub struct EventsListener {
    id: ListenerId,
    filter: u32,
    receiver: mpsc::Receiver<Arc<Event>>,
}

impl EventsListener {
    /// Identity to pass to `remove_events_listener`.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Event-kind bitmask this listener was attached with.
    pub fn filter(&self) -> u32 {
        self.filter
    }

    /// Next event, or `None` once the listener is detached and drained.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.receiver.recv().await
    }

    /// Next event if one is ready.
    pub fn try_recv(&mut self) -> Result<Arc<Event>, TryRecvError> {
        self.receiver.try_recv()
    }
}

struct ListenerEntry {
    filter: u32,
    sender: mpsc::Sender<Arc<Event>>,
    detached: CancellationToken,
    in_flight: TaskTracker,
    /// Started on the first overflow.
    backlog: OnceLock<mpsc::UnboundedSender<Arc<Event>>>,
    /// Events accepted into the backlog and not yet handed to the channel.
    queued: Arc<AtomicUsize>,
}

impl ListenerEntry {
    fn backlog(&self, id: ListenerId) -> &mpsc::UnboundedSender<Arc<Event>> {
        self.backlog.get_or_init(|| {
            let (backlog, pending) = mpsc::unbounded_channel();
            let _ = self.in_flight.spawn(forward(
                id,
                pending,
                self.sender.clone(),
                self.detached.clone(),
                Arc::clone(&self.queued),
            ));
            trace!(listener = %id, "listener backlog started");
            backlog
        })
    }
}

/// Listener table. Not synchronized; the hub guards it with its lock.
pub(crate) struct ListenerRegistry {
    entries: HashMap<ListenerId, ListenerEntry>,
    next_id: u64,
    buffer: usize,
}

impl ListenerRegistry {
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            buffer: buffer.max(1),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a listener for `filter` and hand back its receiving side.
    pub(crate) fn add(&mut self, filter: u32) -> EventsListener {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        let (sender, receiver) = mpsc::channel(self.buffer);
        let _ = self.entries.insert(
            id,
            ListenerEntry {
                filter,
                sender,
                detached: CancellationToken::new(),
                in_flight: TaskTracker::new(),
                backlog: OnceLock::new(),
                queued: Arc::new(AtomicUsize::new(0)),
            },
        );
        self.record_active();
        debug!(listener = %id, filter = format_args!("{filter:#x}"), "listener attached");

        EventsListener {
            id,
            filter,
            receiver,
        }
    }

    /// Detach a listener. Returns `false` if `id` is not registered.
    ///
    /// Backlogged deliveries are abandoned; the channel closes once the
    /// forwarder has returned.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.record_active();

        entry.detached.cancel();
        let _ = entry.in_flight.close();
        if entry.in_flight.is_empty() {
            debug!(listener = %id, "listener detached");
            return true;
        }

        debug!(
            listener = %id,
            queued = entry.queued.load(Ordering::Acquire),
            "listener detached, waiting for forwarder"
        );
        let ListenerEntry {
            sender, in_flight, ..
        } = entry;
        let _ = tokio::spawn(async move {
            in_flight.wait().await;
            drop(sender);
            trace!(listener = %id, "listener channel closed");
        });
        true
    }

    /// Hand `event` to every listener whose filter selects it.
    ///
    /// Returns the number of listeners that matched.
    pub(crate) fn dispatch(&self, event: &Arc<Event>) -> usize {
        let mut matched = 0usize;
        for (&id, entry) in &self.entries {
            if !event.matches(entry.filter) {
                continue;
            }
            matched += 1;

            // Anything already backlogged must reach the channel first.
            let overflow = if entry.queued.load(Ordering::Acquire) == 0 {
                match entry.sender.try_send(Arc::clone(event)) {
                    Ok(()) => continue,
                    Err(TrySendError::Closed(_)) => {
                        debug!(listener = %id, "listener receiver dropped, event discarded");
                        continue;
                    }
                    Err(TrySendError::Full(event)) => event,
                }
            } else {
                Arc::clone(event)
            };

            let _ = entry.queued.fetch_add(1, Ordering::AcqRel);
            if entry.backlog(id).send(overflow).is_err() {
                let _ = entry.queued.fetch_sub(1, Ordering::AcqRel);
                trace!(listener = %id, "listener backlog closed, event discarded");
            }
        }
        counter!(EVENT_DELIVERIES_TOTAL).increment(matched as u64);
        matched
    }

    fn record_active(&self) {
        gauge!(LISTENERS_ACTIVE).set(self.entries.len() as f64);
    }
}

/// Move backlogged events into the listener's channel, in order, until detach.
async fn forward(
    id: ListenerId,
    mut pending: mpsc::UnboundedReceiver<Arc<Event>>,
    sender: mpsc::Sender<Arc<Event>>,
    detached: CancellationToken,
    queued: Arc<AtomicUsize>,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = detached.cancelled() => break,
            next = pending.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };
        tokio::select! {
            biased;
            () = detached.cancelled() => break,
            result = sender.send(event) => {
                if result.is_err() {
                    debug!(listener = %id, "listener receiver dropped, event discarded");
                }
            }
        }
        let _ = queued.fetch_sub(1, Ordering::AcqRel);
    }
    trace!(
        listener = %id,
        abandoned = queued.load(Ordering::Acquire),
        "listener forwarder stopped"
    );
}
