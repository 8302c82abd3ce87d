//! Connection Registry
//!
//! The live set of authenticated chat connections.
//!
//! Every mutation and every fan-out takes the same lock, so a broadcast never
//! observes a half-removed entry and nothing is delivered to an entry after
//! [`ConnectionRegistry::unregister`] has returned. Fan-out under the lock is
//! cheap: each delivery is a non-blocking `try_send` onto the connection's
//! bounded writer queue. A connection whose queue is full is not keeping up
//! and is evicted along with those whose writer has already gone.
//!
//! The registry holds the only sender for each connection. Dropping an entry
//! ends its writer task, which closes the socket.

use std::collections::HashMap;

use axum::extract::ws::{close_code, CloseCode, Utf8Bytes};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::messages::OutboundFrame;
use crate::infrastructure::metrics;

pub type ConnectionId = Uuid;

/// One live participant
#[derive(Debug)]
pub struct ConnectionEntry {
    pub id: ConnectionId,
    pub user_id: i64,
    sender: mpsc::Sender<OutboundFrame>,
}

impl ConnectionEntry {
    pub fn new(
        id: ConnectionId,
        user_id: i64,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        Self {
            id,
            user_id,
            sender,
        }
    }

    /// Queue a close frame and release the writer. With a full queue the
    /// writer falls back to its own close once the queue drains.
    pub fn close(self, code: CloseCode, reason: &'static str) {
        let _ = self.sender.try_send(OutboundFrame::Close { code, reason });
    }

    fn deliver(&self, frame: &Utf8Bytes) -> Result<(), EvictionReason> {
        match self.sender.try_send(OutboundFrame::Text(frame.clone())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EvictionReason::QueueFull),
            Err(TrySendError::Closed(_)) => Err(EvictionReason::WriterGone),
        }
    }
}

/// Why a broadcast dropped an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The writer task has ended
    WriterGone,
    /// The peer stopped reading and its queue filled up
    QueueFull,
}

impl EvictionReason {
    /// Metric label for `forum_chat_evictions_total`
    pub fn as_label(&self) -> &'static str {
        match self {
            EvictionReason::WriterGone => "delivery_failure",
            EvictionReason::QueueFull => "slow_consumer",
        }
    }
}

/// One entry dropped during fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub connection: ConnectionInfo,
    pub reason: EvictionReason,
}

/// Read-only view of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub user_id: i64,
}

/// Result of one fan-out
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: Vec<Eviction>,
}

/// Returned by [`ConnectionRegistry::register`] once the registry is closed.
/// Carries the rejected entry back to the caller.
#[derive(Debug)]
pub struct RegistryClosed(pub ConnectionEntry);

#[derive(Debug, Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. A user may hold any number of entries.
    pub fn register(&self, entry: ConnectionEntry) -> Result<(), RegistryClosed> {
        let (id, user_id) = (entry.id, entry.user_id);
        let connected = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(RegistryClosed(entry));
            }
            state.connections.insert(id, entry);
            state.connections.len()
        };
        metrics::set_websocket_connections(connected);

        tracing::info!(
            connection_id = %id,
            user_id = user_id,
            connected = connected,
            "Connection registered"
        );
        Ok(())
    }

    /// Remove a connection. Returns the entry if this call removed it; a
    /// second call for the same id is a no-op.
    pub fn unregister(&self, id: ConnectionId) -> Option<ConnectionEntry> {
        let (entry, connected) = {
            let mut state = self.state.lock();
            let entry = state.connections.remove(&id);
            (entry, state.connections.len())
        };

        if let Some(entry) = &entry {
            metrics::set_websocket_connections(connected);
            tracing::info!(
                connection_id = %id,
                user_id = entry.user_id,
                connected = connected,
                "Connection unregistered"
            );
        }
        entry
    }

    /// Deliver one encoded frame to every registered connection. Entries whose
    /// writer has gone away or whose queue is full are evicted in the same
    /// critical section.
    pub fn broadcast(&self, frame: &Utf8Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let connected = {
            let mut state = self.state.lock();
            state
                .connections
                .retain(|_, entry| match entry.deliver(frame) {
                    Ok(()) => {
                        report.delivered += 1;
                        true
                    }
                    Err(reason) => {
                        report.evicted.push(Eviction {
                            connection: ConnectionInfo {
                                id: entry.id,
                                user_id: entry.user_id,
                            },
                            reason,
                        });
                        false
                    }
                });
            state.connections.len()
        };

        if !report.evicted.is_empty() {
            metrics::set_websocket_connections(connected);
        }
        report
    }

    /// Current members.
    pub fn snapshot(&self) -> Vec<ConnectionInfo> {
        self.state
            .lock()
            .connections
            .values()
            .map(|entry| ConnectionInfo {
                id: entry.id,
                user_id: entry.user_id,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Refuse further registrations and drop every entry. Each writer sees
    /// its queue end and closes its socket. Returns the number of entries
    /// dropped.
    pub fn close_all(&self) -> usize {
        let drained: Vec<ConnectionEntry> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.connections.drain().map(|(_, entry)| entry).collect()
        };
        metrics::set_websocket_connections(0);

        let count = drained.len();
        for entry in drained {
            metrics::record_eviction("shutdown");
            entry.close(close_code::AWAY, "server shutting down");
        }
        count
    }
}
