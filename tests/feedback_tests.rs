// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the feedback client against a local stub server

mod common;

use common::{StubServer, closed_endpoint};
use fitcheck::ErrorKind;
use fitcheck::config::{Credential, FeedbackSettings};
use fitcheck::feedback::{FeedbackClient, FeedbackResult, FeedbackService};
use fitcheck::pipelines::photo::EncodedPayload;
use std::time::Duration;

fn payload() -> EncodedPayload {
    EncodedPayload {
        data: "/9j/AAAA".to_string(),
        width: 576,
        height: 768,
        quality: 50,
        compressed_len: 6,
    }
}

fn client(endpoint: &str, credential: Credential) -> FeedbackClient {
    let settings = FeedbackSettings {
        endpoint: endpoint.to_string(),
        ..FeedbackSettings::default()
    };
    FeedbackClient::new(&settings, credential).expect("client should build")
}

#[tokio::test]
async fn test_success_is_trimmed_and_request_shaped() {
    let server = StubServer::start(200, r#"{"choices":[{"message":{"content":" Nice fit. "}}]}"#).await;
    let client = client(&server.endpoint, Credential::new("sk-test"));

    let result = client.request_feedback(&payload()).await;
    assert_eq!(result, FeedbackResult::Success("Nice fit.".to_string()));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.head.starts_with("POST /v1/chat/completions"));
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer sk-test"));
    assert!(
        request
            .header("content-type")
            .is_some_and(|value| value.starts_with("application/json"))
    );

    let json = request.json();
    assert_eq!(json["model"], "gpt-4-turbo");
    assert_eq!(json["max_tokens"], 300);
    assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["role"], "user");
    assert!(
        json["messages"][1]["content"]
            .as_str()
            .unwrap()
            .ends_with("data:image/jpeg;base64,/9j/AAAA")
    );
}

#[tokio::test]
async fn test_empty_object_is_malformed() {
    let server = StubServer::start(200, "{}").await;
    let result = client(&server.endpoint, Credential::new("sk-test"))
        .request_feedback(&payload())
        .await;

    let err = result.error().expect("expected failure");
    assert_eq!(err.kind, ErrorKind::MalformedResponse);
    assert_eq!(err.detail, "{}");
}

#[tokio::test]
async fn test_empty_body_is_empty_response() {
    let server = StubServer::start(200, "").await;
    let result = client(&server.endpoint, Credential::new("sk-test"))
        .request_feedback(&payload())
        .await;

    assert_eq!(result, FeedbackResult::failure(ErrorKind::EmptyResponse, ""));
}

#[tokio::test]
async fn test_server_error_is_single_attempt() {
    let server = StubServer::start(500, "upstream exploded").await;
    let result = client(&server.endpoint, Credential::new("sk-test"))
        .request_feedback(&payload())
        .await;

    let err = result.error().expect("expected failure");
    assert_eq!(err.kind, ErrorKind::MalformedResponse);
    assert_eq!(err.detail, "HTTP 500: upstream exploded");
    assert_eq!(server.request_count(), 1, "no retry expected");
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let server = StubServer::start(200, r#"{"choices":[{"message":{"content":"hi"}}]}"#).await;
    let result = client(&server.endpoint, Credential::missing())
        .request_feedback(&payload())
        .await;

    assert_eq!(result, FeedbackResult::failure(ErrorKind::MissingCredential, ""));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let endpoint = closed_endpoint().await;
    let result = client(&endpoint, Credential::new("sk-test"))
        .request_feedback(&payload())
        .await;

    let err = result.error().expect("expected failure");
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_ne!(err.detail, "timeout");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = StubServer::start_with_delay(
        200,
        r#"{"choices":[{"message":{"content":"too late"}}]}"#,
        Duration::from_secs(5),
    )
    .await;
    let settings = FeedbackSettings {
        endpoint: server.endpoint.clone(),
        timeout_secs: 1,
        ..FeedbackSettings::default()
    };
    let client = FeedbackClient::new(&settings, Credential::new("sk-test")).unwrap();

    let result = client.request_feedback(&payload()).await;
    assert_eq!(result, FeedbackResult::failure(ErrorKind::Transport, "timeout"));
}
