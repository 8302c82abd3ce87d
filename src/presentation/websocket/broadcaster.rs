//! Broadcaster
//!
//! The single fan-out path. Producers push decorated messages onto an
//! unbounded queue and never wait; one task drains it in order, so every
//! connection sees messages in the order they were published. Sessions
//! publish through `ChatHub::post`, which keeps that order equal to the
//! order messages were stored.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::encode;
use super::registry::ConnectionRegistry;
use crate::application::dto::DecoratedMessage;
use crate::infrastructure::metrics;

#[derive(Clone)]
pub struct Broadcaster {
    queue: mpsc::UnboundedSender<DecoratedMessage>,
}

impl Broadcaster {
    /// Start the fan-out task. It runs until every `Broadcaster` clone is
    /// dropped.
    pub fn spawn(registry: Arc<ConnectionRegistry>) -> (Self, JoinHandle<()>) {
        let (queue, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(rx, registry));
        (Self { queue }, handle)
    }

    /// Queue a message for every registered connection.
    pub fn publish(&self, message: DecoratedMessage) -> bool {
        let message_id = message.id;
        if self.queue.send(message).is_err() {
            tracing::error!(
                message_id = message_id,
                "Broadcaster stopped, message not delivered"
            );
            return false;
        }
        true
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<DecoratedMessage>,
    registry: Arc<ConnectionRegistry>,
) {
    while let Some(message) = rx.recv().await {
        let frame = match encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(message_id = message.id, error = %e, "Failed to encode message");
                continue;
            }
        };

        let started = Instant::now();
        let report = registry.broadcast(&frame);
        metrics::record_broadcast(started.elapsed().as_secs_f64());

        for evicted in &report.evicted {
            metrics::record_eviction(evicted.reason.as_label());
            tracing::info!(
                connection_id = %evicted.connection.id,
                user_id = evicted.connection.user_id,
                reason = evicted.reason.as_label(),
                "Connection evicted during broadcast"
            );
        }

        tracing::debug!(
            message_id = message.id,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Message broadcast"
        );
    }

    tracing::debug!("Broadcaster stopped");
}
