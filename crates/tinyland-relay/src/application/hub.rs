//! The broadcast hub: the single fan-out point between ingest and browsers.
//!
//! The hub owns the set of connected browser sessions.  Each session is an
//! entry mapping its [`SessionId`] to the sending half of a bounded queue;
//! the session's own writer task drains the receiving half into its
//! WebSocket.
//!
//! ```text
//!                         ┌─► queue ─► writer task ─► browser A
//! ingest ─► BroadcastHub ─┼─► queue ─► writer task ─► browser B
//!                         └─► queue ─► writer task ─► browser C
//! ```
//!
//! # Why the hub never blocks
//!
//! [`BroadcastHub::broadcast`] only calls `try_send`.  If a browser's queue
//! is full, that browser misses the event and everyone else is unaffected.
//! The ingest loop therefore never waits for a slow browser, and because the
//! ingest loop calls `broadcast` one event at a time, every queue receives
//! events in the order they were accepted.
//!
//! # Locking
//!
//! The session map sits behind a `std::sync::RwLock` that is only held for
//! short, synchronous sections (never across an `.await`).  Broadcasting
//! takes the read lock; join and leave take the write lock.  A session that
//! leaves during a broadcast is therefore either fully present or fully
//! gone.  A poisoned lock is recovered instead of propagating the panic.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, trace};

use tinyland_core::{PositionUpdate, RelayEvent};

use crate::domain::session::SessionId;

/// One serialised event, shared by every session queue it is pushed into.
pub type Frame = Arc<str>;

/// Outcome of one broadcast, counted per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Sessions whose queue accepted the event.
    pub delivered: usize,
    /// Sessions that missed the event because their queue was full.
    pub lagged: usize,
    /// Sessions found already closed; they were removed from the hub.
    pub closed: usize,
}

/// Receiver of accepted updates.
///
/// This is the seam between the ingest listener and the hub: the listener
/// only knows it has somewhere to publish to.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Hands one accepted update over for delivery.
    fn publish(&self, update: PositionUpdate) -> DeliveryReport;
}

/// Shared, cheaply cloneable handle to the session set.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    sessions: RwLock<HashMap<SessionId, mpsc::Sender<Frame>>>,
    queue_capacity: usize,
}

impl BroadcastHub {
    /// Creates an empty hub whose sessions each buffer up to
    /// `queue_capacity` events (at least one).
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                sessions: RwLock::new(HashMap::new()),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    /// Adds a new session to the active set.
    ///
    /// The returned [`Subscription`] only sees events broadcast after this
    /// call; nothing is replayed.  Dropping it removes the session.
    pub fn join(&self) -> Subscription {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);

        let count = {
            let mut sessions = self.write_sessions();
            sessions.insert(id, tx);
            sessions.len()
        };
        debug!("session {id} joined hub ({count} active)");

        Subscription {
            id,
            rx,
            hub: self.clone(),
        }
    }

    /// Number of sessions currently in the active set.
    pub fn session_count(&self) -> usize {
        self.read_sessions().len()
    }

    /// Pushes `event` into the queue of every session present right now.
    ///
    /// The event is serialised once and the resulting frame shared between
    /// all queues.
    pub fn broadcast(&self, event: &RelayEvent) -> DeliveryReport {
        let frame: Frame = match event.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                error!("failed to serialise {} event: {e}", event.name());
                return DeliveryReport::default();
            }
        };

        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();

        {
            let sessions = self.read_sessions();
            for (id, tx) in sessions.iter() {
                match tx.try_send(Arc::clone(&frame)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        trace!("session {id}: queue full, event skipped");
                        report.lagged += 1;
                    }
                    Err(TrySendError::Closed(_)) => {
                        report.closed += 1;
                        closed.push(*id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            let mut sessions = self.write_sessions();
            for id in &closed {
                sessions.remove(id);
                debug!("session {id}: pruned closed session from hub");
            }
        }

        report
    }

    /// Removes `id` from the active set.  Returns `false` if it was not present.
    fn leave(&self, id: SessionId) -> bool {
        let (removed, count) = {
            let mut sessions = self.write_sessions();
            let removed = sessions.remove(&id).is_some();
            (removed, sessions.len())
        };
        if removed {
            debug!("session {id} left hub ({count} active)");
        }
        removed
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<SessionId, mpsc::Sender<Frame>>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, mpsc::Sender<Frame>>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for BroadcastHub {
    fn publish(&self, update: PositionUpdate) -> DeliveryReport {
        self.broadcast(&RelayEvent::from(update))
    }
}

/// A session's membership in the hub and the receiving end of its queue.
///
/// Dropping the subscription removes the session from the hub.
pub struct Subscription {
    id: SessionId,
    rx: mpsc::Receiver<Frame>,
    hub: BroadcastHub,
}

impl Subscription {
    /// The session this subscription belongs to.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Waits for the next frame.  Returns `None` once the hub has dropped
    /// this session.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Returns a queued frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.leave(self.id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
