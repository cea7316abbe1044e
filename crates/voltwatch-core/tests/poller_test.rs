#![allow(clippy::unwrap_used)]
// Realtime poller behavior against a mock server.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voltwatch_core::{
    ConnectionState, Credential, ErrorKind, MemoryTokenStore, RealtimePoller, Session,
    SessionConfig, TickOutcome, TokenStore,
};

// ── Helpers ─────────────────────────────────────────────────────────

const READING: &str = "/api/energy/ESP32_EnergyMonitor";

async fn setup(tweak: impl FnOnce(&mut SessionConfig)) -> (MockServer, RealtimePoller) {
    let server = MockServer::start().await;
    let mut config = SessionConfig::new(
        Url::parse(&server.uri()).unwrap(),
        "admin",
        SecretString::from("secret".to_string()),
    );
    config.timeout = Duration::from_millis(500);
    config.retry_delay = Duration::from_millis(10);
    config.poll_interval = Duration::from_millis(40);
    tweak(&mut config);

    // Pre-authenticated so tests only mock the reading endpoint.
    let store = Arc::new(MemoryTokenStore::new());
    store.save(&Credential::new("jwt")).unwrap();
    let session = Session::new(config, store).unwrap();
    (server, RealtimePoller::new(session))
}

fn reading(power: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "voltage": "220.1",
        "current": 1.0,
        "power": power,
        "energy": 2.5,
        "timestamp": "2025-05-10T19:00:00Z"
    }))
}

// ── Tick tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_tick_applies_sample() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(550.0))
        .mount(&server)
        .await;

    assert_eq!(poller.tick().await, TickOutcome::Updated);

    let state = poller.state();
    assert_eq!(state.connection, ConnectionState::Connected);
    let current = state.current.unwrap();
    assert!((current.voltage - 220.1).abs() < 1e-9);
    assert!((current.frequency - 50.0).abs() < 1e-9);
    assert_eq!(current.device_id, "ESP32_EnergyMonitor");
    assert_eq!(state.history.len(), 1);
    assert!(state.last_error.is_none());
    assert!(poller.estimated_cost().is_some());
}

#[tokio::test]
async fn test_failure_keeps_last_sample_and_disconnects() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(100.0))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Internal server error" })),
        )
        .mount(&server)
        .await;

    assert_eq!(poller.tick().await, TickOutcome::Updated);
    assert_eq!(poller.tick().await, TickOutcome::Failed(ErrorKind::Server));

    let state = poller.state();
    assert_eq!(state.connection, ConnectionState::Disconnected);
    assert!(state.current.is_some(), "last good sample must survive a failure");
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.failures, 1);
    assert!(state.last_error.unwrap().contains("Internal server error"));
}

#[tokio::test]
async fn test_unreachable_server_is_connectivity() {
    let (server, poller) = setup(|c| {
        c.timeout = Duration::from_millis(50);
        c.retries = 1;
    })
    .await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(1.0).set_delay(Duration::from_millis(400)))
        .expect(2)
        .mount(&server)
        .await;

    assert_eq!(poller.tick().await, TickOutcome::Failed(ErrorKind::Connectivity));
    assert_eq!(poller.state().connection, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_missing_endpoint_is_endpoint_error() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Not found" })))
        .mount(&server)
        .await;

    assert_eq!(poller.tick().await, TickOutcome::Failed(ErrorKind::Endpoint));
}

#[tokio::test]
async fn test_non_object_payload_is_validation_error() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;

    assert_eq!(poller.tick().await, TickOutcome::Failed(ErrorKind::Validation));
}

#[tokio::test]
async fn test_overlapping_tick_is_skipped() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(1.0).set_delay(Duration::from_millis(150)))
        .expect(1)
        .mount(&server)
        .await;

    let (first, second) = tokio::join!(poller.tick(), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        poller.tick().await
    });
    assert_eq!(first, TickOutcome::Updated);
    assert_eq!(second, TickOutcome::Skipped);
}

#[tokio::test]
async fn test_buffer_is_bounded() {
    let (server, poller) = setup(|c| c.history_capacity = 3).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(1.0))
        .mount(&server)
        .await;

    for _ in 0..5 {
        assert_eq!(poller.tick().await, TickOutcome::Updated);
    }
    let state = poller.state();
    assert_eq!(state.history.len(), 3);
    assert_eq!(state.ticks, 5);
}

// ── Lifecycle tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_start_polls_until_stopped() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(1.0))
        .mount(&server)
        .await;

    let mut rx = poller.subscribe();
    poller.start();
    assert!(poller.is_running());

    tokio::time::timeout(Duration::from_secs(5), async {
        while rx.borrow_and_update().ticks < 3 {
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    poller.stop().await;
    assert!(!poller.is_running());
    let frozen = poller.state().ticks;

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(poller.state().ticks, frozen, "no ticks after stop");
    assert_eq!(poller.tick().await, TickOutcome::Stopped);

    poller.start();
    assert_eq!(poller.tick().await, TickOutcome::Updated);
    poller.stop().await;
}

#[tokio::test]
async fn test_tick_resolving_after_stop_is_discarded() {
    let (server, poller) = setup(|_| {}).await;
    Mock::given(method("GET"))
        .and(path(READING))
        .respond_with(reading(1.0).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let ticking = poller.clone();
    let tick = tokio::spawn(async move { ticking.tick().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    poller.stop().await;

    assert_eq!(tick.await.unwrap(), TickOutcome::Discarded);
    let state = poller.state();
    assert_eq!(state.ticks, 0);
    assert!(state.current.is_none());
}
