//! Connection Lifecycle Tests
//!
//! Keepalive eviction, peers dropping out and graceful shutdown.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::common::*;
use forum_chat::config::ChatSettings;

fn fast_keepalive() -> ChatSettings {
    ChatSettings {
        ping_interval_secs: 1,
        read_deadline_secs: 2,
        ..ChatSettings::default()
    }
}

#[tokio::test]
async fn test_silent_peer_is_evicted_after_read_deadline() {
    let app = TestApp::spawn_with(fast_keepalive()).await;
    let (mut silent, _) = app.connect(X).await;
    let (y, _) = app.connect(Y).await;
    app.wait_for_connections(2).await;

    // Y keeps reading, so its client answers every ping. X is never polled
    // and never answers.
    let (mut y_tx, mut y_rx) = y.split();
    let (frames_tx, mut frames) = mpsc::unbounded_channel::<Value>();
    tokio::spawn(async move {
        while let Some(Ok(msg)) = y_rx.next().await {
            if let Message::Text(text) = msg {
                let _ = frames_tx.send(serde_json::from_str(text.as_str()).unwrap());
            }
        }
    });

    app.wait_for_connections(1).await;
    assert_eq!(app.chat.registry().snapshot()[0].user_id, Y);

    y_tx.send(Message::text(json!({"content": "still here"}).to_string()))
        .await
        .unwrap();
    let message = tokio::time::timeout(WAIT, frames.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message["content"], "still here");

    // The stream is closed. A reset may race the close frame, so the code
    // is only checked when the frame made it through.
    if let Some(frame) = next_close(&mut silent).await {
        assert_eq!(u16::from(frame.code), 1008);
    }
}

#[tokio::test]
async fn test_peer_that_stops_reading_is_evicted() {
    let app = TestApp::spawn_with(ChatSettings {
        ping_interval_secs: 1,
        read_deadline_secs: 2,
        send_queue_capacity: 64,
        write_timeout_secs: 1,
        ..ChatSettings::default()
    })
    .await;
    let (stuck, _) = app.connect(X).await;
    let (y, _) = app.connect(Y).await;
    app.wait_for_connections(2).await;

    // X keeps its read deadline fresh with unsolicited pongs but never reads.
    let (mut stuck_tx, _stuck_rx) = stuck.split();
    let keepalive = tokio::spawn(async move {
        while stuck_tx.send(Message::Pong(Default::default())).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    let (mut y_tx, mut y_rx) = y.split();
    tokio::spawn(async move { while let Some(Ok(_)) = y_rx.next().await {} });

    let content = "a".repeat(4000);
    let evicted = tokio::time::timeout(Duration::from_secs(60), async {
        let mut sent = 0usize;
        while app.chat.connection_count() == 2 {
            y_tx.send(Message::text(json!({ "content": content }).to_string()))
                .await
                .unwrap();
            sent += 1;
            if sent % 50 == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    })
    .await;

    assert!(evicted.is_ok(), "peer that stopped reading is still registered");
    let remaining = app.chat.registry().snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_id, Y);
    keepalive.abort();
}

#[tokio::test]
async fn test_dropped_peer_is_removed_and_others_still_receive() {
    let app = TestApp::spawn().await;
    let (a, _) = app.connect(X).await;
    let (mut b, _) = app.connect(Y).await;
    let (mut c, _) = app.connect(Z).await;
    app.wait_for_connections(3).await;

    // No close handshake: the TCP connection just goes away.
    drop(a);
    send_json(&mut b, json!({"content": "after a left"})).await;

    for client in [&mut b, &mut c] {
        assert_eq!(next_json(client).await["content"], "after a left");
    }
    app.wait_for_connections(2).await;
    assert!(app
        .chat
        .registry()
        .snapshot()
        .iter()
        .all(|info| info.user_id != X));
}

#[tokio::test]
async fn test_client_close_unregisters() {
    let app = TestApp::spawn().await;
    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;

    x.close(None).await.unwrap();

    app.wait_for_connections(0).await;
}

#[tokio::test]
async fn test_graceful_shutdown_closes_every_stream() {
    let mut app = TestApp::spawn_with(ChatSettings {
        shutdown_grace_secs: 3,
        ..ChatSettings::default()
    })
    .await;
    let (mut x, _) = app.connect(X).await;
    let (mut y, _) = app.connect(Y).await;
    app.wait_for_connections(2).await;

    app.shutdown().await;

    for client in [&mut x, &mut y] {
        let frame = next_close(client).await.expect("close frame");
        assert_eq!(u16::from(frame.code), 1001);
    }
    assert!(!app.chat.is_accepting());
    assert_eq!(app.chat.connection_count(), 0);
    assert_eq!(app.chat.live_sessions(), 0);
}
