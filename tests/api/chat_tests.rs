//! Chat Stream Tests

use futures::SinkExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;
use tokio_tungstenite::tungstenite::Message;

use crate::common::*;
use forum_chat::config::ChatSettings;

#[tokio::test]
async fn test_reply_scenario_end_to_end() {
    let app = TestApp::spawn().await;

    let (mut x, history) = app.connect(X).await;
    assert!(history.is_empty());
    app.wait_for_connections(1).await;

    send_json(&mut x, json!({"content": "hello"})).await;
    let hello = next_json(&mut x).await;
    assert_eq!(hello["id"], 1);
    assert_eq!(hello["content"], "hello");
    assert_eq!(hello["user"], json!({"id": X, "username": "x"}));
    assert!(hello["created_at"].is_string());
    assert!(hello.get("reply_to").is_none());

    let (mut y, history) = app.connect(Y).await;
    assert_eq!(history, vec![hello.clone()]);
    app.wait_for_connections(2).await;

    send_json(&mut y, json!({"content": "hi", "reply_to_id": 1})).await;
    for client in [&mut x, &mut y] {
        let reply = next_json(client).await;
        assert_eq!(reply["id"], 2);
        assert_eq!(reply["content"], "hi");
        assert_eq!(reply["user"], json!({"id": Y, "username": "y"}));
        assert_eq!(
            reply["reply_to"],
            json!({"id": 1, "content": "hello", "username": "x"})
        );
    }
}

#[tokio::test]
async fn test_history_is_most_recent_n_oldest_first() {
    let app = TestApp::spawn_with(ChatSettings {
        history_limit: 3,
        ..ChatSettings::default()
    })
    .await;
    for (i, author) in [X, Y, X, Y, Z].into_iter().enumerate() {
        app.messages.seed(&format!("m{}", i + 1), author);
    }

    let (_client, history) = app.connect(Z).await;

    let contents: Vec<_> = history.iter().map(|m| m["content"].clone()).collect();
    assert_eq!(contents, vec![json!("m3"), json!("m4"), json!("m5")]);
    assert_eq!(history[0]["user"]["username"], "x");
    assert_eq!(history[2]["user"]["username"], "z");
}

#[tokio::test]
async fn test_history_is_not_broadcast() {
    let app = TestApp::spawn().await;
    app.messages.seed("old", X);

    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;
    let (_y, history) = app.connect(Y).await;
    assert_eq!(history.len(), 1);
    app.wait_for_connections(2).await;

    // The first live frame X sees is the next broadcast, not Y's replay.
    send_json(&mut x, json!({"content": "live"})).await;
    assert_eq!(next_json(&mut x).await["content"], "live");
}

#[tokio::test]
async fn test_history_failure_still_sends_an_empty_batch() {
    let app = TestApp::spawn().await;
    app.messages.seed("old", X);
    app.messages.fail_next_reads(1);

    let (mut x, history) = app.connect(X).await;
    assert!(history.is_empty());
    app.wait_for_connections(1).await;

    send_json(&mut x, json!({"content": "live"})).await;
    let live = next_json(&mut x).await;
    assert_eq!(live["content"], "live");
    assert_eq!(live["id"], 2);
}

#[tokio::test]
async fn test_broadcast_order_follows_store_order() {
    let app = TestApp::spawn().await;
    let (mut observer, _) = app.connect(Z).await;
    let mut senders = Vec::new();
    for user in [X, Y, X] {
        senders.push(app.connect(user).await.0);
    }
    app.wait_for_connections(4).await;

    let tasks: Vec<_> = senders
        .into_iter()
        .enumerate()
        .map(|(n, mut ws)| {
            tokio::spawn(async move {
                for i in 0..20 {
                    send_json(&mut ws, json!({"content": format!("s{}-{}", n, i)})).await;
                }
                ws
            })
        })
        .collect();

    let mut ids = Vec::new();
    for _ in 0..60 {
        ids.push(next_json(&mut observer).await["id"].as_i64().unwrap());
    }
    assert_eq!(ids, (1..=60).collect::<Vec<i64>>());
    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn test_reply_to_missing_message_is_stored_without_relation() {
    let app = TestApp::spawn().await;
    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;

    send_json(&mut x, json!({"content": "orphan", "reply_to_id": 42})).await;
    let message = next_json(&mut x).await;

    assert_eq!(message["content"], "orphan");
    assert!(message.get("reply_to").is_none());
    assert_eq!(app.messages.len(), 1);
}

#[tokio::test]
async fn test_every_tab_of_a_user_receives_broadcasts() {
    let app = TestApp::spawn().await;
    let (mut tab1, _) = app.connect(X).await;
    let (mut tab2, _) = app.connect(X).await;
    let (mut y, _) = app.connect(Y).await;
    app.wait_for_connections(3).await;

    send_json(&mut y, json!({"content": "to everyone"})).await;

    for client in [&mut tab1, &mut tab2, &mut y] {
        assert_eq!(next_json(client).await["content"], "to everyone");
    }
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let app = TestApp::spawn().await;
    let (mut x, _) = app.connect(X).await;
    let (mut y, _) = app.connect(Y).await;
    app.wait_for_connections(2).await;

    for i in 0..10 {
        send_json(&mut x, json!({"content": format!("n{}", i)})).await;
    }

    for client in [&mut x, &mut y] {
        for i in 0..10 {
            assert_eq!(next_json(client).await["content"], format!("n{}", i));
        }
    }
}

#[tokio::test]
async fn test_persistence_failure_drops_only_that_message() {
    let app = TestApp::spawn().await;
    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;

    app.messages.fail_next_writes(1);
    send_json(&mut x, json!({"content": "lost"})).await;
    send_json(&mut x, json!({"content": "kept"})).await;

    let message = next_json(&mut x).await;
    assert_eq!(message["content"], "kept");
    assert_eq!(message["id"], 1);
    assert_eq!(app.chat.connection_count(), 1);
}

#[test_case("not json" ; "unparseable")]
#[test_case("[1, 2]" ; "not an object")]
#[test_case(r#"{"content": "   "}"# ; "blank content")]
#[test_case(r#"{"content": "hi", "reply_to_id": 0}"# ; "non positive reply target")]
#[tokio::test]
async fn test_malformed_payload_closes_with_invalid_data(payload: &str) {
    let app = TestApp::spawn().await;
    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;

    x.send(Message::text(payload)).await.unwrap();

    let frame = next_close(&mut x).await.expect("close frame");
    assert_eq!(u16::from(frame.code), 1007);
    app.wait_for_connections(0).await;
    assert_eq!(app.messages.len(), 0);
}

#[tokio::test]
async fn test_oversized_content_is_rejected() {
    let app = TestApp::spawn_with(ChatSettings {
        max_content_length: 10,
        ..ChatSettings::default()
    })
    .await;
    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;

    send_json(&mut x, json!({"content": "a".repeat(11)})).await;

    let frame = next_close(&mut x).await.expect("close frame");
    assert_eq!(u16::from(frame.code), 1007);
}

#[tokio::test]
async fn test_binary_frame_closes_with_unsupported_data() {
    let app = TestApp::spawn().await;
    let (mut x, _) = app.connect(X).await;
    app.wait_for_connections(1).await;

    x.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();

    let frame = next_close(&mut x).await.expect("close frame");
    assert_eq!(u16::from(frame.code), 1003);
    app.wait_for_connections(0).await;
}
