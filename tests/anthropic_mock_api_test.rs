//! Mock API tests for the vendor Messages transport
//!
//! These tests use wiremock to simulate Anthropic API responses, including
//! the failure shapes the retry loop is expected to absorb.

mod support;

use anthropic_transport::prelude::*;
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use support::*;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn send_returns_text_usage_and_finish_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"model": "claude-3-5-sonnet-20241022", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Hello! How can I help?")))
        .expect(1)
        .mount(&server)
        .await;

    let client = vendor_client(&server.uri());
    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.content, "Hello! How can I help?");
    assert_eq!(response.finish_reason, FinishReason::EndTurn);
    assert_eq!(response.usage.input_tokens, 10);
    assert_eq!(response.usage.output_tokens, 15);
}

#[tokio::test]
async fn tool_use_response_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"tools": [{"name": "get_weather"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01T1x1fJ34qw5pBdwsBKZEu",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "tool_use",
                "id": "toolu_01",
                "name": "get_weather",
                "input": {"location": "San Francisco, CA"}
            }],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 10}
        })))
        .mount(&server)
        .await;

    let tools = vec![ToolDefinition::function(
        "get_weather",
        "Look up the weather",
        json!({"location": {"type": "string"}}),
    )];
    let response = vendor_client(&server.uri())
        .send(&hello(), &tools, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.finish_reason, FinishReason::ToolUse);
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "get_weather");
    let input: serde_json::Value = serde_json::from_str(&response.tool_calls[0].input).unwrap();
    assert_eq!(input, json!({"location": "San Francisco, CA"}));
}

#[tokio::test]
async fn rate_limit_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(error_envelope("rate_limit_error", "Rate limit exceeded")),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("finally")))
        .expect(1)
        .mount(&server)
        .await;

    let response = vendor_client(&server.uri())
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "finally");
}

#[tokio::test]
async fn overloaded_beyond_ceiling_reports_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(529).set_body_json(error_envelope("overloaded_error", "Overloaded")),
        )
        .expect(3)
        .mount(&server)
        .await;

    let client = AnthropicClient::builder()
        .api_key("sk-test")
        .base_url(server.uri())
        .model(model())
        .retry_policy(fast_policy().with_max_retries(2))
        .build()
        .unwrap();

    let err = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MaxRetriesExceeded { max_retries: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::RateLimited);
}

#[tokio::test]
async fn context_overflow_resends_with_adjusted_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 50000})))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_envelope(
            "invalid_request_error",
            "input length and `max_tokens` exceed context limit: 154978 + 50000 > 200000",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 44022})))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("fits now")))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::builder()
        .api_key("sk-test")
        .base_url(server.uri())
        .model(ModelInfo::new("claude-3-5-sonnet-20241022", 50_000))
        .retry_policy(fast_policy())
        .build()
        .unwrap();

    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "fits now");
    assert_eq!(client.adjusted_max_tokens(), Some(44_022));
}

fn overflow(input: u64, max_tokens: u64) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(error_envelope(
        "invalid_request_error",
        &format!("input length and `max_tokens` exceed context limit: {input} + {max_tokens} > 200000"),
    ))
}

fn overflow_client(server: &MockServer, policy: RetryPolicy) -> AnthropicClient {
    AnthropicClient::builder()
        .api_key("sk-test")
        .base_url(server.uri())
        .model(ModelInfo::new("claude-3-5-sonnet-20241022", 50_000))
        .retry_policy(policy)
        .build()
        .unwrap()
}

#[tokio::test]
async fn adjusted_budget_survives_later_rate_limit_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 50000})))
        .respond_with(overflow(154_978, 50_000))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 44022})))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(error_envelope("rate_limit_error", "Rate limit exceeded")),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 44022})))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = overflow_client(&server, fast_policy());
    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "ok");
    assert_eq!(client.adjusted_max_tokens(), Some(44_022));
}

#[tokio::test]
async fn second_overflow_replaces_adjusted_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 50000})))
        .respond_with(overflow(154_978, 50_000))
        .expect(1)
        .mount(&server)
        .await;
    // 200000 - 180000 - 1000
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 44022})))
        .respond_with(overflow(180_000, 44_022))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 19000})))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("smaller")))
        .expect(1)
        .mount(&server)
        .await;

    let client = overflow_client(&server, fast_policy());
    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "smaller");
    assert_eq!(client.adjusted_max_tokens(), Some(19_000));
}

#[tokio::test]
async fn zero_output_floor_still_shrinks_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 50000})))
        .respond_with(overflow(199_500, 50_000))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("tiny")))
        .expect(1)
        .mount(&server)
        .await;

    let mut policy = fast_policy().with_max_retries(2);
    policy.min_output_tokens = 0;
    let client = overflow_client(&server, policy);
    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "tiny");
    assert_eq!(client.adjusted_max_tokens(), Some(1));
}

#[tokio::test]
async fn unauthorized_refreshes_credential_and_resends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-stale"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(error_envelope("authentication_error", "invalid x-api-key")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("authorized")))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::builder()
        .api_key("sk-stale")
        .base_url(server.uri())
        .model(model())
        .credential_resolver(Arc::new(StaticCredential::new("sk-fresh")))
        .build()
        .unwrap();

    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "authorized");
}

struct FailingResolver;

#[async_trait]
impl CredentialResolver for FailingResolver {
    async fn resolve(&self) -> Result<SecretString, LlmError> {
        Err(LlmError::Configuration("keychain locked".into()))
    }
}

#[tokio::test]
async fn failed_credential_refresh_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(error_envelope("authentication_error", "invalid x-api-key")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::builder()
        .api_key("sk-stale")
        .base_url(server.uri())
        .model(model())
        .credential_resolver(Arc::new(FailingResolver))
        .build()
        .unwrap();

    let err = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        LlmError::Credential(message) => assert!(message.contains("keychain locked")),
        other => panic!("expected Credential error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_retryable_status_fails_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(error_envelope("invalid_request_error", "messages: field required")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = vendor_client(&server.uri())
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LlmError::Api {
            status: 400,
            message: "messages: field required".into(),
            retry_after: None
        }
    );
}

#[tokio::test]
async fn bearer_credential_and_reasoning_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("authorization", "Bearer oauth-token"))
        .and(header("anthropic-beta", "interleaved-thinking-2025-05-14"))
        .and(header("x-team", "infra"))
        .and(body_partial_json(json!({
            "temperature": 1.0,
            "thinking": {"type": "enabled", "budget_tokens": 6553},
            "metadata": {"user_id": "u-1"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("thought")))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::builder()
        .api_key("Bearer oauth-token")
        .base_url(server.uri())
        .model(model().with_reasoning(true))
        .reasoning(true)
        .header("x-team", "infra")
        .extra_body("metadata", json!({"user_id": "u-1"}))
        .build()
        .unwrap();

    let response = client
        .send(&hello(), &[], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "thought");
}

#[tokio::test]
async fn cancellation_during_backoff_returns_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(error_envelope("rate_limit_error", "slow down")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = vendor_client(&server.uri());
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.send(&hello(), &[], &token).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}
