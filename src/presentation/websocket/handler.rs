//! WebSocket Connection Handler
//!
//! Drives one chat session: history replay, registration, the read loop with
//! its deadline, and a writer task that owns the socket sink and sends
//! keepalive pings. Every socket write is bounded by the write timeout, so a
//! peer that stops reading ends its own session.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::hub::ChatHub;
use super::messages::{CloseCause, OutboundFrame};
use super::registry::{ConnectionEntry, ConnectionId, RegistryClosed};
use super::session::SessionState;
use crate::application::dto::ChatMessageRequest;
use crate::application::services::AuthenticatedUser;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// How long a closing session waits for its writer to flush the close frame
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket upgrade handler. The identity is attached by the auth middleware.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Response, AppError> {
    let hub = state.chat.clone();
    if !hub.is_accepting() {
        return Err(AppError::ServiceUnavailable(
            "Chat is shutting down".to_string(),
        ));
    }

    let max_message_size = hub.settings().max_message_size;
    let max_frame_size = hub.settings().max_frame_size;
    let user_id = user.user_id;
    Ok(ws
        .max_message_size(max_message_size)
        .max_frame_size(max_frame_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!(user_id = user_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(socket, hub, user)))
}

/// Handle one upgraded connection until it closes
async fn handle_socket(socket: WebSocket, hub: ChatHub, user: AuthenticatedUser) {
    let _live = hub.session_guard();
    let connection_id = Uuid::new_v4();
    let mut session = SessionState::new(connection_id, user.user_id);
    session.mark_upgraded();

    tracing::debug!(
        connection_id = %connection_id,
        user_id = user.user_id,
        role = %user.role,
        "New chat connection"
    );

    let (sink, mut receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<OutboundFrame>(hub.settings().send_queue_capacity);
    let mut writer = tokio::spawn(write_loop(
        sink,
        rx,
        hub.settings().ping_interval(),
        hub.settings().write_timeout(),
        connection_id,
    ));

    // History goes out before registration so no live broadcast can
    // overtake it.
    replay_history(&hub, &tx, connection_id).await;

    if let Err(RegistryClosed(entry)) = hub
        .registry()
        .register(ConnectionEntry::new(connection_id, user.user_id, tx))
    {
        tracing::debug!(
            connection_id = %connection_id,
            "Registry closed, dropping connection"
        );
        session.begin_close(CloseCause::WriterGone);
        entry.close(close_code::AWAY, "server shutting down");
        drain_writer(&mut writer).await;
        session.finish();
        return;
    }
    session.activate();

    let read_deadline = hub.settings().read_deadline();
    let cause = loop {
        let next = tokio::select! {
            biased;
            _ = &mut writer => break CloseCause::WriterGone,
            next = timeout(read_deadline, receiver.next()) => next,
        };

        let frame = match next {
            Err(_) => break CloseCause::ReadDeadline,
            Ok(None) => break CloseCause::ClientClosed,
            Ok(Some(Err(e))) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break CloseCause::StreamError;
            }
            Ok(Some(Ok(frame))) => frame,
        };
        session.touch();

        match frame {
            Message::Text(text) => match hub.service().parse(text.as_str()) {
                Ok(request) => handle_message(&hub, &mut session, request).await,
                Err(e) => {
                    metrics::record_message("rejected");
                    tracing::warn!(
                        connection_id = %connection_id,
                        user_id = session.user_id,
                        error = %e,
                        "Rejecting malformed payload"
                    );
                    break CloseCause::MalformedPayload;
                }
            },
            Message::Binary(_) => {
                metrics::record_message("rejected");
                break CloseCause::UnsupportedPayload;
            }
            // Pongs only refresh the deadline; pings are answered by axum.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => break CloseCause::ClientClosed,
        }
    };

    if session.begin_close(cause) {
        close_session(&hub, &session, cause);
    }
    if cause != CloseCause::WriterGone {
        drain_writer(&mut writer).await;
    }
    session.finish();

    tracing::info!(
        connection_id = %connection_id,
        user_id = session.user_id,
        cause = ?cause,
        messages_sent = session.messages_sent,
        duration_secs = session.connected_at.elapsed().as_secs(),
        idle_secs = session.last_seen.elapsed().as_secs(),
        "Chat session closed"
    );
}

/// Deliver the recent history to this connection only, as one batch. The
/// batch is always sent; it is empty when the store could not be read.
async fn replay_history(
    hub: &ChatHub,
    tx: &mpsc::Sender<OutboundFrame>,
    connection_id: ConnectionId,
) {
    let history = match hub.service().history().await {
        Ok(history) => history,
        Err(e) => {
            tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "Failed to load chat history, sending an empty batch"
            );
            Vec::new()
        }
    };

    match OutboundFrame::json(&history) {
        Ok(frame) => {
            // The queue is fresh, so the batch always fits.
            let _ = tx.try_send(frame);
            tracing::debug!(
                connection_id = %connection_id,
                messages = history.len(),
                "History replayed"
            );
        }
        Err(e) => {
            tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "Failed to encode history"
            );
        }
    }
}

/// Persist, decorate and publish one inbound message. Never cancelled by
/// the writer ending; a message that reached the store is still broadcast.
async fn handle_message(
    hub: &ChatHub,
    session: &mut SessionState,
    request: ChatMessageRequest,
) {
    match hub.post(session.user_id, request).await {
        Ok(_) => {
            metrics::record_message("persisted");
            session.record_sent();
        }
        Err(e) => {
            metrics::record_message("dropped");
            tracing::error!(
                connection_id = %session.connection_id,
                user_id = session.user_id,
                error = %e,
                "Failed to persist chat message, dropping it"
            );
        }
    }
}

/// Leave the registry. If the entry was still ours, send the close frame
/// that matches the cause.
fn close_session(hub: &ChatHub, session: &SessionState, cause: CloseCause) {
    if let Some(entry) = hub.registry().unregister(session.connection_id) {
        metrics::record_eviction(cause.as_label());
        entry.close(cause.close_code(), cause.reason());
    }
}

async fn drain_writer(writer: &mut tokio::task::JoinHandle<()>) {
    if timeout(WRITER_DRAIN_TIMEOUT, &mut *writer).await.is_err() {
        writer.abort();
    }
}

/// Owns the sink. Ends when its queue closes, on a close frame or on the
/// first write that fails or exceeds `write_timeout`.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundFrame>,
    ping_interval: Duration,
    write_timeout: Duration,
    connection_id: ConnectionId,
) {
    let mut keepalive = interval_at(Instant::now() + ping_interval, ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if !write_frame(&mut sink, Message::Text(text), write_timeout, connection_id).await {
                        return;
                    }
                }
                Some(OutboundFrame::Close { code, reason }) => {
                    let close = Message::Close(Some(CloseFrame {
                        code,
                        reason: Utf8Bytes::from_static(reason),
                    }));
                    write_frame(&mut sink, close, write_timeout, connection_id).await;
                    return;
                }
                // Evicted: the registry dropped our sender.
                None => {
                    let close = Message::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: Utf8Bytes::from_static(""),
                    }));
                    write_frame(&mut sink, close, write_timeout, connection_id).await;
                    return;
                }
            },
            _ = keepalive.tick() => {
                let ping = Message::Ping(Bytes::new());
                if !write_frame(&mut sink, ping, write_timeout, connection_id).await {
                    return;
                }
            }
        }
    }
}

/// Send one frame. False if the write failed or the peer stopped reading.
async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    write_timeout: Duration,
    connection_id: ConnectionId,
) -> bool {
    match timeout(write_timeout, sink.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Write failed");
            false
        }
        Err(_) => {
            tracing::warn!(
                connection_id = %connection_id,
                timeout_secs = write_timeout.as_secs(),
                "Write timed out, peer is not reading"
            );
            false
        }
    }
}
