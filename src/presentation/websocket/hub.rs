//! Chat Hub
//!
//! The explicitly constructed chat subsystem: connection registry,
//! broadcaster, chat service and a count of live sessions. Built once at
//! startup and shared with every session through the router state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use super::broadcaster::Broadcaster;
use super::registry::ConnectionRegistry;
use crate::application::dto::{ChatMessageRequest, DecoratedMessage};
use crate::application::services::ChatService;
use crate::config::ChatSettings;
use crate::shared::error::AppError;

#[derive(Clone)]
pub struct ChatHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Broadcaster,
    service: ChatService,
    settings: ChatSettings,
    /// Held from persist to publish
    post_lock: Mutex<()>,
    accepting: AtomicBool,
    live_sessions: watch::Sender<usize>,
}

impl ChatHub {
    /// Must be called from within a Tokio runtime; spawns the broadcaster.
    pub fn new(service: ChatService, settings: ChatSettings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let (broadcaster, _task) = Broadcaster::spawn(Arc::clone(&registry));
        let (live_sessions, _) = watch::channel(0);

        Self {
            inner: Arc::new(HubInner {
                registry,
                broadcaster,
                service,
                settings,
                post_lock: Mutex::new(()),
                accepting: AtomicBool::new(true),
                live_sessions,
            }),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn service(&self) -> &ChatService {
        &self.inner.service
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.inner.settings
    }

    pub fn publish(&self, message: DecoratedMessage) -> bool {
        self.inner.broadcaster.publish(message)
    }

    /// Persist a message and hand it to the broadcaster. Posts from all
    /// sessions are serialized, so broadcast order is store order. Returns
    /// the stored message id.
    pub async fn post(&self, author_id: i64, request: ChatMessageRequest) -> Result<i64, AppError> {
        let _order = self.inner.post_lock.lock().await;
        let message = self.inner.service.post(author_id, request).await?;
        let id = message.id;
        self.publish(message);
        Ok(id)
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Sessions that have been upgraded and not yet finished.
    pub fn live_sessions(&self) -> usize {
        *self.inner.live_sessions.borrow()
    }

    /// Count a session as live until the guard is dropped.
    pub fn session_guard(&self) -> SessionGuard {
        self.inner.live_sessions.send_modify(|n| *n += 1);
        SessionGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stop accepting, close every connection and wait up to the configured
    /// grace period for sessions to finish. Returns false if the grace period
    /// elapsed first.
    pub async fn shutdown(&self) -> bool {
        self.inner.accepting.store(false, Ordering::SeqCst);
        let closed = self.inner.registry.close_all();
        tracing::info!(connections = closed, "Chat hub shutting down");

        let mut live = self.inner.live_sessions.subscribe();
        let grace = self.inner.settings.shutdown_grace();
        let drained = tokio::time::timeout(grace, live.wait_for(|n| *n == 0))
            .await
            .map(|result| result.is_ok());

        match drained {
            Ok(_) => {
                tracing::info!("All chat sessions finished");
                true
            }
            Err(_) => {
                tracing::warn!(
                    remaining = *live.borrow(),
                    grace_secs = grace.as_secs(),
                    "Chat sessions still running after shutdown grace period"
                );
                false
            }
        }
    }
}

/// Decrements the live-session count on drop
pub struct SessionGuard {
    inner: Arc<HubInner>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.inner
            .live_sessions
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}
