/// Live ranking fan-out over WebSocket
///
/// Architecture:
/// 1. ConnectionHub: registry of live connections, one outbound queue each
/// 2. NotificationPublisher: delivers ranking envelopes (Redis or in-process)
/// 3. Pub/Sub bridge: forwards Redis channel messages into hub broadcasts
use crate::metrics;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    RwLock,
};
use tracing::{debug, warn};
use uuid::Uuid;

pub mod messages;
pub mod publisher;
pub mod pubsub;

pub use messages::Notification;
pub use publisher::{LocalPublisher, NotificationPublisher, RedisPublisher};

/// Payload shared by every connection receiving the same broadcast
pub type OutboundMessage = Arc<str>;

pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Unique identifier for a live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hub-side half of a client connection.
///
/// The session owning the socket drains the matching receiver; once the hub
/// drops this half the receiver ends and the session closes the socket.
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<OutboundMessage>,
}

impl Connection {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                id: ConnectionId::new(),
                outbound,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Outcome of a single broadcast call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Registry of live connections and fan-out broadcaster.
///
/// Register, unregister and the broadcast pass are serialized by one lock.
/// Delivery is a non-blocking push into each connection's own queue, so a
/// slow client never holds the lock while its socket drains.
#[derive(Default, Clone)]
pub struct ConnectionHub {
    inner: Arc<RwLock<HashMap<ConnectionId, mpsc::Sender<OutboundMessage>>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection: Connection) -> ConnectionId {
        let mut guard = self.inner.write().await;
        guard.insert(connection.id, connection.outbound);
        metrics::set_live_connections(guard.len());

        debug!(
            connection_id = %connection.id,
            total = guard.len(),
            "websocket connection registered"
        );

        connection.id
    }

    /// Remove a connection, closing its outbound queue. Returns whether it
    /// was still registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        let removed = guard.remove(&id).is_some();
        metrics::set_live_connections(guard.len());

        if removed {
            debug!(connection_id = %id, remaining = guard.len(), "websocket connection unregistered");
        }

        removed
    }

    /// Send `payload` to every registered connection.
    ///
    /// A connection whose queue is closed or full is removed; the rest still
    /// receive the payload.
    pub async fn broadcast(&self, payload: impl Into<OutboundMessage>) -> BroadcastReport {
        let payload = payload.into();
        let mut guard = self.inner.write().await;
        let mut report = BroadcastReport::default();

        guard.retain(|id, sender| match sender.try_send(payload.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %id, "outbound buffer full, disconnecting slow client");
                report.dropped += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %id, "connection already closed, removing");
                report.dropped += 1;
                false
            }
        });

        metrics::set_live_connections(guard.len());
        metrics::record_broadcast(report.delivered, report.dropped);

        if report.dropped > 0 {
            debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                "broadcast cleaned up dead connections"
            );
        }

        report
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drop every connection; used on shutdown
    pub async fn close_all(&self) -> usize {
        let mut guard = self.inner.write().await;
        let closed = guard.len();
        guard.clear();
        metrics::set_live_connections(0);
        closed
    }
}
