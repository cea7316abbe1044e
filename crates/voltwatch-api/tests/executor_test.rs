#![allow(clippy::unwrap_used)]
// Retry, timeout and cancellation behavior of `FetchExecutor`.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voltwatch_api::{ApiRequest, Error, FetchExecutor, TransportConfig};

fn transport() -> TransportConfig {
    TransportConfig {
        timeout: Duration::from_millis(50),
        retry_delay: Duration::from_millis(10),
        ..TransportConfig::default()
    }
}

fn executor() -> FetchExecutor {
    FetchExecutor::with_client(reqwest::Client::new(), &transport())
}

fn request(server: &MockServer) -> ApiRequest {
    ApiRequest::get(Url::parse(&format!("{}/api/energy/meter", server.uri())).unwrap())
}

fn slow() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "power": 1.0 }))
        .set_delay(Duration::from_millis(500))
}

#[tokio::test]
async fn test_timeouts_exhaust_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(slow())
        .expect(4)
        .mount(&server)
        .await;

    let err = executor()
        .execute(&request(&server), 3, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Connectivity { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("expected Connectivity error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_retries_makes_one_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(slow())
        .expect(1)
        .mount(&server)
        .await;

    let err = executor()
        .execute(&request(&server), 0, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Connectivity { attempts: 1, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(slow())
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "power": 42.0 })))
        .expect(1)
        .mount(&server)
        .await;

    let value = executor()
        .execute(&request(&server), 3, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(value["power"], json!(42.0));
}

#[tokio::test]
async fn test_server_error_is_returned_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "Internal server error",
            "message": "database offline"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = executor()
        .execute(&request(&server), 3, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_cancelled_token_aborts_before_sending() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = executor()
        .execute(&request(&server), 3, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled), "got {err:?}");
}

#[tokio::test]
async fn test_cancel_during_inflight_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let exec = FetchExecutor::with_client(
        reqwest::Client::new(),
        &TransportConfig {
            timeout: Duration::from_secs(10),
            ..transport()
        },
    );
    let req = request(&server);

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = exec.execute(&req, 3, &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled), "got {err:?}");
}

#[tokio::test]
async fn test_non_json_body_with_multibyte_text_is_deserialization_error() {
    let server = MockServer::start().await;

    let body = format!("{}é not json", "x".repeat(199));
    Mock::given(method("GET"))
        .and(path("/api/energy/meter"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let err = executor()
        .execute(&request(&server), 0, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Deserialization { message, body: raw } => {
            assert_eq!(raw, body);
            assert!(message.contains(&format!("{}é", "x".repeat(199))), "{message}");
            assert!(!message.contains("not json"), "{message}");
        }
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}
