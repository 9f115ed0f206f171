//! Mock API tests for the on-premise gateway transport

mod support;

use anthropic_transport::prelude::*;
use serde_json::json;
use std::time::Duration;
use support::*;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GATEWAY_PATH: &str = "/v2/api/claude/messages";

fn gateway_client(server: &MockServer, api_key: &str) -> AnthropicClient {
    AnthropicClient::builder()
        .api_key(api_key)
        .base_url(format!("{}/v2/api/claude/", server.uri()))
        .model(ModelInfo::new("claude-onprem", 8192))
        .retry_policy(fast_policy())
        .build()
        .unwrap()
}

#[tokio::test]
async fn gateway_request_shape_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GATEWAY_PATH))
        .and(header("authorization", "corp-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "claude-onprem",
            "max_tokens": 8192,
            "stream": false,
            "messages": [{"role": "user", "content": "Hello"}],
            "system": "You are terse."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Hi."}],
            "usage": {"input_tokens": 9, "output_tokens": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = gateway_client(&server, "corp-token");
    assert!(client.is_gateway());

    let messages = vec![
        ConversationMessage::system("You are terse."),
        ConversationMessage::user("Hello"),
    ];
    let response = client
        .send(&messages, &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "Hi.");
    assert_eq!(response.usage.input_tokens, 9);
    assert_eq!(response.usage.output_tokens, 2);
    assert_eq!(response.finish_reason, FinishReason::EndTurn);
}

#[tokio::test]
async fn gateway_status_taxonomy_without_retry() {
    let cases: Vec<(u16, fn(&LlmError) -> bool)> = vec![
        (401, |e| matches!(e, LlmError::Credential(_))),
        (403, |e| matches!(e, LlmError::Authorization(_))),
        (404, |e| matches!(e, LlmError::EndpointConfig(_))),
        (500, |e| matches!(e, LlmError::UpstreamService { status: 500, .. })),
        (429, |e| matches!(e, LlmError::Api { status: 429, message, .. } if message == "busy")),
    ];

    for (status, check) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GATEWAY_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("busy"))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway_client(&server, "corp-token")
            .send(&hello(), &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(check(&err), "status {status} mapped to {err:?}");
    }
}

#[tokio::test]
async fn gateway_requires_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GATEWAY_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = gateway_client(&server, "")
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Credential(_)));
}

#[tokio::test]
async fn gateway_stream_replays_single_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GATEWAY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"text": "streamed"}],
            "usage": {"input_tokens": 3, "output_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let events = collect(gateway_client(&server, "corp-token").stream(
        hello(),
        vec![],
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(events.len(), 4);
    assert_eq!(events[0], ProviderEvent::ContentStart);
    assert_eq!(events[1], ProviderEvent::ContentDelta("streamed".into()));
    assert_eq!(events[2], ProviderEvent::ContentStop);
    match &events[3] {
        ProviderEvent::Complete(response) => {
            assert_eq!(response.content, "streamed");
            assert_eq!(response.usage.output_tokens, 4);
            assert_eq!(response.finish_reason, FinishReason::EndTurn);
        }
        other => panic!("expected Complete, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_cancellation_aborts_inflight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GATEWAY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_json(json!({"content": [{"text": "late"}]})),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = gateway_client(&server, "corp-token")
        .send(&hello(), &[], &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
}
