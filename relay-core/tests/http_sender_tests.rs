//! Tests for the shared HTTP sender

use relay_core::http::{ErrorClassifier, HttpSender, OutgoingRequest, RequestOptions};
use relay_core::providers::ProviderError;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Reports every rejection as an invalid request
struct StrictClassifier;

impl ErrorClassifier for StrictClassifier {
    fn classify(&self, backend: &str, status: StatusCode, _body: &[u8]) -> ProviderError {
        ProviderError::InvalidRequest(format!("{} answered {}", backend, status.as_u16()))
    }
}

#[tokio::test]
async fn test_request_id_and_sensitive_headers() {
    let server = MockServer::start().await;
    let request_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("x-request-id", request_id.to_string().as_str()))
        .and(header("x-api-key", "secret"))
        .and(header("content-type", "application/json"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let sender = HttpSender::new().unwrap();
    let options = RequestOptions {
        request_id,
        ..RequestOptions::default()
    };
    let request = OutgoingRequest::post_json("test", format!("{}/echo", server.uri()), b"{}".to_vec())
        .header("x-api-key", "secret")
        .with_options(options);

    let body: Value = sender.send_json(request, &CancellationToken::new()).await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_per_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let sender = HttpSender::new().unwrap();
    let request = OutgoingRequest::post_json("test", server.uri(), Vec::new())
        .with_options(RequestOptions::default().with_timeout(Duration::from_millis(100)));

    let err = sender
        .send_bytes(request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)), "{:?}", err);
}

#[tokio::test]
async fn test_cancel_during_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let sender = HttpSender::new().unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let request = OutgoingRequest::post_json("test", server.uri(), Vec::new());
    let err = sender.send_bytes(request, &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_custom_classifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let sender = HttpSender::new().unwrap().with_classifier(Arc::new(StrictClassifier));
    let request = OutgoingRequest::post_json("strict", server.uri(), Vec::new());

    match sender.send_bytes(request, &CancellationToken::new()).await {
        Err(ProviderError::InvalidRequest(message)) => assert_eq!(message, "strict answered 503"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_default_classifier_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Malformed input request"})))
        .mount(&server)
        .await;

    let sender = HttpSender::new().unwrap();
    let request = OutgoingRequest::post_json("bedrock", server.uri(), Vec::new());
    let err = sender
        .send_bytes(request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    match err {
        ProviderError::Backend(backend) => {
            assert_eq!(backend.message, "Malformed input request");
            assert!(backend.body.contains("Malformed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_header_value_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sender = HttpSender::new().unwrap();
    let request = OutgoingRequest::post_json("test", server.uri(), Vec::new())
        .header("x-api-key", "secret\n");

    match sender.send_bytes(request, &CancellationToken::new()).await {
        Err(ProviderError::InvalidRequest(message)) => assert!(message.contains("x-api-key"), "{}", message),
        other => panic!("unexpected result: {:?}", other),
    }
}
