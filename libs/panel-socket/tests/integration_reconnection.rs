//! Integration tests for reconnection
//!
//! These tests verify backoff timing, attempt limits and recovery.

mod common;

use common::{mock_connector, EventLog, Outcome};
use panel_socket::traits::reconnect::{
    ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy,
};
use panel_socket::traits::SocketError;
use panel_socket::{ConnectionState, SocketClient};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

fn backoff(max_attempts: Option<u32>) -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(1000),
        Duration::from_millis(30_000),
        max_attempts,
    )
}

#[test]
fn test_exponential_backoff_full_sequence() {
    verbose_println!("Testing exponential backoff full sequence...");

    let strategy = backoff(Some(5));
    let expected_delays = [1000, 1500, 2250, 3375, 5063];

    for (attempt, &expected_ms) in expected_delays.iter().enumerate() {
        let delay = strategy.next_delay(attempt as u32).unwrap();
        verbose_println!("  Attempt {}: {:?}", attempt, delay);
        assert_eq!(delay.as_millis(), expected_ms, "Unexpected delay at attempt {}", attempt);
    }

    assert!(!strategy.should_reconnect(5), "Should stop after max attempts");
}

#[test]
fn test_fixed_and_never_strategies() {
    let fixed = FixedDelay::new(Duration::from_millis(250), Some(2));
    assert_eq!(fixed.next_delay(0), Some(Duration::from_millis(250)));
    assert_eq!(fixed.next_delay(1), Some(Duration::from_millis(250)));
    assert!(!fixed.should_reconnect(2));

    assert!(!NeverReconnect.should_reconnect(0));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_then_reconnect_failed() {
    let (connector, mut handle) = mock_connector([Outcome::Accept], Outcome::Refuse);
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .reconnect_strategy(backoff(Some(3)))
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;

    let lost_at = Instant::now();
    session.drop_connection();
    events.wait_for("reconnect_failed").await;

    let reconnects: Vec<String> = events
        .labels()
        .into_iter()
        .filter(|l| l.starts_with("reconnecting") || l.starts_with("reconnect_failed"))
        .collect();
    verbose_println!("events: {:?}", events.labels());
    assert_eq!(
        reconnects,
        vec![
            "reconnecting:1:1000",
            "reconnecting:2:1500",
            "reconnecting:3:2250",
            "reconnect_failed:3",
        ]
    );

    let first = events.time_of("reconnecting:1").unwrap();
    assert_eq!(first - lost_at, Duration::from_millis(1000));
    let failed = events.time_of("reconnect_failed").unwrap();
    assert_eq!(failed - lost_at, Duration::from_millis(4750));

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(handle.attempts(), 4);
    assert_eq!(client.metrics().reconnect_count, 3);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.attempts(), 4, "no attempts after reconnect_failed");
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_success_resets_backoff() {
    let (connector, mut handle) = mock_connector(
        [Outcome::Accept, Outcome::Refuse, Outcome::Accept],
        Outcome::Accept,
    );
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .reconnect_strategy(backoff(Some(10)))
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;
    session.drop_connection();

    let _second = handle.next_session().await;
    events.wait_for("reconnecting:2").await;
    tokio::task::yield_now().await;

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.reconnect_state().attempts, 0);
    assert_eq!(
        client.reconnect_state().current_interval,
        Duration::from_millis(1000)
    );
    assert_eq!(events.count("connected"), 2);
    assert_eq!(events.count("disconnected:1006"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_messages_sent_during_outage_arrive_after_reconnect() {
    let (connector, mut handle) = mock_connector([], Outcome::Accept);
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;
    session.drop_connection();
    events.wait_for("disconnected").await;

    assert_eq!(client.state(), ConnectionState::Reconnecting);
    assert!(!client.send(json!({"type": "select_reader", "reader": "r2"})));
    assert_eq!(client.queued_len(), 1);

    let mut next = handle.next_session().await;
    assert_eq!(next.next_json().await["reader"], "r2");
    assert_eq!(client.queued_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_disconnect_stops_pending_reconnect() {
    let (connector, mut handle) = mock_connector([Outcome::Accept], Outcome::Refuse);
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;
    session.drop_connection();
    events.wait_for("disconnected").await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(handle.attempts(), 1);
    assert_eq!(events.count("reconnecting"), 0);
    assert_eq!(events.count("manual_disconnect"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabling_auto_reconnect_abandons_pending_backoff() {
    let (connector, mut handle) = mock_connector([Outcome::Accept], Outcome::Refuse);
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;
    session.drop_connection();
    events.wait_for("disconnected").await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    client.set_auto_reconnect(false);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.reconnect_state().attempts, 0);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(handle.attempts(), 1);
    assert_eq!(
        events.labels(),
        vec!["connected", "disconnected:1006", "disconnected:1000"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_disabling_auto_reconnect_while_connected_keeps_session() {
    let (connector, mut handle) = mock_connector([], Outcome::Accept);
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;
    client.set_auto_reconnect(false);
    assert_eq!(client.state(), ConnectionState::Connected);

    session.drop_connection();
    events.wait_for("disconnected").await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(events.labels(), vec!["connected", "disconnected:1006"]);
}

#[tokio::test(start_paused = true)]
async fn test_waiter_on_final_reconnect_sees_reconnection_failed() {
    let (connector, mut handle) = mock_connector(
        [Outcome::Accept],
        Outcome::RefuseAfter(Duration::from_millis(500)),
    );
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .reconnect_strategy(backoff(Some(1)))
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let mut session = handle.next_session().await;
    session.drop_connection();
    events.wait_for("reconnecting:1").await;
    assert_eq!(client.state(), ConnectionState::Connecting);

    // joins the attempt the backoff timer started
    let err = client.connect().await.unwrap_err();
    assert!(
        matches!(err, SocketError::ReconnectionFailed { attempts: 1 }),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(events.count("reconnect_failed:1"), 1);
    assert_eq!(handle.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_connect_after_disconnect_rearms_reconnect() {
    let (connector, mut handle) = mock_connector([], Outcome::Accept);
    let client = SocketClient::builder()
        .url("ws://reader-panel.test/ws")
        .connector(connector)
        .disable_heartbeat()
        .build()
        .unwrap();
    let events = EventLog::attach(&client);

    client.connect().await.unwrap();
    let _first = handle.next_session().await;
    client.disconnect();

    client.connect().await.unwrap();
    let mut second = handle.next_session().await;
    second.drop_connection();

    events.wait_for("reconnecting").await;
    let _third = handle.next_session().await;
    assert_eq!(handle.attempts(), 3);
}
