//! Gateway Integration Tests
//!
//! Drive a real client against the scripted mock gateway over TCP.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use cord_gateway::protocol::{Envelope, OpCode};
use cord_gateway::{GatewayClient, GatewayError, Listener, Message, SessionState};
use integration_tests::*;
use serde_json::{json, Value};
use tokio::sync::mpsc;

async fn next_message(events: &mut mpsc::UnboundedReceiver<Recorded>) -> Message {
    loop {
        match next_recorded(events).await.expect("no hook call") {
            Recorded::Message(message) => return message,
            Recorded::Connect => {}
        }
    }
}

fn client_for(gateway: &MockGateway) -> (Arc<GatewayClient>, mpsc::UnboundedReceiver<Recorded>) {
    let (handler, events) = RecordingHandler::new();
    let client = GatewayClient::new(test_gateway_config(gateway.url()), handler);
    (Arc::new(client), events)
}

/// Accept a connection and complete Hello -> Identify -> READY
async fn handshake(gateway: &mut MockGateway, session_id: &str) -> MockConnection {
    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(45_000).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();
    conn.send(&ready(1, session_id, None)).await.unwrap();
    conn
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_identify_ready_message_close() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, mut events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    assert_eq!(next_recorded(&mut events).await.unwrap(), Recorded::Connect);

    conn.hello(45_000).await.unwrap();
    let identify = conn.expect_op(OpCode::Identify).await.unwrap();
    assert_eq!(identify.d["token"], TEST_TOKEN);
    assert_eq!(identify.d["intents"], 513);
    assert_eq!(identify.d["large_threshold"], 50);
    assert_eq!(identify.d["compress"], false);
    assert_eq!(identify.d["properties"]["$os"], "linux");
    assert_eq!(identify.s, None);
    assert_eq!(identify.t, None);

    conn.send(&ready(1, "abc", None)).await.unwrap();
    conn.send(&message_create(2, "hello there")).await.unwrap();

    let message = next_message(&mut events).await;
    assert_eq!(message.content, "hello there");
    assert_eq!(message.author.id, "2");
    assert_eq!(message.channel_id, "200");

    let session = client.session();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.session_id().as_deref(), Some("abc"));
    assert_eq!(session.current_user().unwrap().id, BOT_USER_ID);
    assert_eq!(session.last_sequence(), Some(2));

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
    assert_eq!(conn.expect_close().await.unwrap(), Some(1000));
    assert_eq!(client.session().state(), SessionState::Closed);
}

#[tokio::test]
async fn test_first_heartbeat_is_sent_right_after_hello() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(45_000).await.unwrap();

    let heartbeat = conn.expect_op(OpCode::Heartbeat).await.unwrap();
    assert_eq!(heartbeat.d, Value::Null);

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_repeated_hello_is_ignored() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = handshake(&mut gateway, "abc").await;
    conn.hello(45_000).await.unwrap();

    // A second Hello must not trigger another Identify; the next Identify-or-Resume
    // frame the server sees would be an error
    conn.send(&Envelope::new(OpCode::Heartbeat, Value::Null)).await.unwrap();
    loop {
        let frame = conn.recv().await.unwrap();
        match frame.opcode() {
            Some(OpCode::Identify | OpCode::Resume) => panic!("handshake sent twice"),
            Some(OpCode::Heartbeat) if frame.d == json!(1) => break,
            _ => {}
        }
    }

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_connect_while_running_is_rejected() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let _conn = handshake(&mut gateway, "abc").await;

    let err = client.connect(TEST_TOKEN).await.unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyRunning));

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

// ============================================================================
// Dispatch Tests
// ============================================================================

#[tokio::test]
async fn test_raw_dispatches_reach_bus_subscribers() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);

    let (tx, mut raw) = mpsc::unbounded_channel();
    for event in ["GUILD_CREATE", "MESSAGE_CREATE"] {
        let tx = tx.clone();
        client.event_bus().subscribe(
            event,
            Listener::new(move |payload| {
                let tx = tx.clone();
                async move {
                    tx.send((event, payload))?;
                    anyhow::Ok(())
                }
            }),
        );
    }

    let task = spawn_connect(&client, TEST_TOKEN);
    let mut conn = handshake(&mut gateway, "abc").await;
    conn.send(&guild_create(2)).await.unwrap();
    conn.send(&message_create(3, "hi")).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..2 {
        let (event, payload) = tokio::time::timeout(STEP_TIMEOUT, raw.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push((event, payload["id"].clone()));
    }
    seen.sort_by_key(|(event, _)| *event);
    assert_eq!(
        seen,
        vec![("GUILD_CREATE", json!("100")), ("MESSAGE_CREATE", json!("m3"))]
    );

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_failing_hook_does_not_stop_session() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, mut events) = client_for(&gateway);

    client.event_bus().subscribe(
        "on_message",
        Listener::new(|_| async { Err::<(), _>(anyhow::anyhow!("subscriber failed")) }),
    );

    let task = spawn_connect(&client, TEST_TOKEN);
    let mut conn = handshake(&mut gateway, "abc").await;
    conn.send(&message_create(2, "first")).await.unwrap();
    conn.send(&message_create(3, "second")).await.unwrap();

    assert_eq!(next_message(&mut events).await.content, "first");
    assert_eq!(next_message(&mut events).await.content, "second");

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

// ============================================================================
// Heartbeat Tests
// ============================================================================

#[tokio::test]
async fn test_heartbeats_carry_latest_sequence() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(100).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();
    conn.send(&ready(1, "abc", None)).await.unwrap();
    conn.send(&guild_create(5)).await.unwrap();

    let found = tokio::time::timeout(STEP_TIMEOUT, async {
        loop {
            let heartbeat = conn.expect_op(OpCode::Heartbeat).await.unwrap();
            conn.send(&Envelope::new(OpCode::HeartbeatAck, Value::Null))
                .await
                .unwrap();
            if heartbeat.d == json!(5) {
                break;
            }
        }
    })
    .await;
    assert!(found.is_ok(), "no heartbeat carried sequence 5");

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_server_requested_heartbeat_is_immediate() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = handshake(&mut gateway, "abc").await;
    conn.send(&guild_create(7)).await.unwrap();
    conn.send(&Envelope::new(OpCode::Heartbeat, Value::Null))
        .await
        .unwrap();

    // The timer interval is 45s, so only the requested beat can carry 7
    let started = Instant::now();
    loop {
        let heartbeat = conn.expect_op(OpCode::Heartbeat).await.unwrap();
        if heartbeat.d == json!(7) {
            break;
        }
    }
    assert!(started.elapsed() < Duration::from_secs(5));

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_unacked_heartbeat_triggers_reconnect() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(50).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();

    // Never ack; the client gives up on this socket and dials again
    assert_eq!(conn.expect_close().await.unwrap(), Some(4000));
    let mut second = gateway.next_connection().await.unwrap();
    second.hello(45_000).await.unwrap();
    second.expect_op(OpCode::Identify).await.unwrap();

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

// ============================================================================
// Reconnect / Resume Tests
// ============================================================================

#[tokio::test]
async fn test_reconnect_request_sends_resume() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = handshake(&mut gateway, "abc").await;
    conn.send(&guild_create(42)).await.unwrap();
    conn.send(&Envelope::new(OpCode::Reconnect, Value::Null))
        .await
        .unwrap();

    let resume = conn.expect_op(OpCode::Resume).await.unwrap();
    assert_eq!(
        resume.d,
        json!({"token": TEST_TOKEN, "session_id": "abc", "seq": 42})
    );
    assert_eq!(client.session().state(), SessionState::Resuming);

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_dropped_connection_resumes() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, mut events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(45_000).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();
    conn.send(&ready(3, "abc", Some(&gateway.resume_url())))
        .await
        .unwrap();
    conn.close(4000, "").await.unwrap();

    let mut second = gateway.next_connection().await.unwrap();
    second.hello(45_000).await.unwrap();
    let resume = second.expect_op(OpCode::Resume).await.unwrap();
    assert_eq!(
        resume.d,
        json!({"token": TEST_TOKEN, "session_id": "abc", "seq": 3})
    );

    second.send(&resumed(4)).await.unwrap();
    second.send(&message_create(5, "after resume")).await.unwrap();
    assert_eq!(next_message(&mut events).await.content, "after resume");
    assert_eq!(client.session().state(), SessionState::Active);

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_reconnect_attempts_exhausted() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let config = cord_common::GatewayConfig {
        max_reconnect_attempts: 1,
        ..test_gateway_config(gateway.url())
    };
    let client = Arc::new(GatewayClient::new(config, handler));
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut first = gateway.next_connection().await.unwrap();
    first.close(4000, "").await.unwrap();
    let mut second = gateway.next_connection().await.unwrap();
    second.close(4000, "").await.unwrap();

    let err = join_connect(task).await.unwrap().unwrap_err();
    assert!(matches!(err, GatewayError::ConnectionLost { attempts: 1 }));
}

// ============================================================================
// Invalid Session / Fatal Tests
// ============================================================================

#[tokio::test]
async fn test_invalid_session_not_resumable_is_fatal() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(45_000).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();
    conn.send(&Envelope::invalid_session(false)).await.unwrap();

    let err = join_connect(task).await.unwrap().unwrap_err();
    assert!(matches!(err, GatewayError::FatalInvalidSession));
    assert!(client.session().is_closed());
    gateway
        .expect_no_connection(Duration::from_millis(200))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_session_resumable_reidentifies_after_backoff() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = handshake(&mut gateway, "abc").await;
    conn.send(&Envelope::invalid_session(true)).await.unwrap();

    let sent_at = Instant::now();
    let identify = conn.expect_op(OpCode::Identify).await.unwrap();
    assert!(sent_at.elapsed() >= Duration::from_millis(40));
    assert_eq!(identify.d["token"], TEST_TOKEN);
    assert!(!client.session().is_closed());

    conn.send(&ready(2, "def", None)).await.unwrap();
    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_heartbeat_acks_are_read_during_invalid_session_backoff() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let config = cord_common::GatewayConfig {
        invalid_session_backoff_ms: 400,
        ..test_gateway_config(gateway.url())
    };
    let client = Arc::new(GatewayClient::new(config, handler));
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(50).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();
    conn.send(&Envelope::invalid_session(true)).await.unwrap();

    // Beats keep coming every 50ms while the re-identify waits; all are acked
    let mut beats_during_backoff = 0;
    loop {
        let frame = conn.recv().await.unwrap();
        match frame.opcode() {
            Some(OpCode::Heartbeat) => {
                beats_during_backoff += 1;
                conn.send(&Envelope::new(OpCode::HeartbeatAck, Value::Null))
                    .await
                    .unwrap();
            }
            Some(OpCode::Identify) => break,
            _ => {}
        }
    }
    assert!(beats_during_backoff >= 2);

    gateway
        .expect_no_connection(Duration::from_millis(100))
        .await
        .unwrap();
    assert!(!client.session().is_closed());

    client.close();
    assert!(join_connect(task).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_malformed_frame_ends_session() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.send_raw("{not json").await.unwrap();

    let err = join_connect(task).await.unwrap().unwrap_err();
    assert!(matches!(err, GatewayError::MalformedPayload(_)));
}

#[tokio::test]
async fn test_authentication_failure_close_code() {
    let mut gateway = MockGateway::start().await.unwrap();
    let (client, _events) = client_for(&gateway);
    let task = spawn_connect(&client, TEST_TOKEN);

    let mut conn = gateway.next_connection().await.unwrap();
    conn.hello(45_000).await.unwrap();
    conn.expect_op(OpCode::Identify).await.unwrap();
    conn.close(4004, "Authentication failed.").await.unwrap();

    let err = join_connect(task).await.unwrap().unwrap_err();
    match err {
        GatewayError::Closed { code, reason } => {
            assert_eq!(code, 4004);
            assert_eq!(reason, "Authentication failed.");
        }
        other => panic!("unexpected error: {other}"),
    }
    gateway
        .expect_no_connection(Duration::from_millis(100))
        .await
        .unwrap();
}
