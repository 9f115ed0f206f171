//! Shared helpers for mock-server tests.

#![allow(dead_code)]

use anthropic_transport::prelude::*;
use serde_json::{Value, json};
use std::time::Duration;

/// Retry policy with millisecond delays so backoff tests run fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new()
        .with_initial_delay(Duration::from_millis(1))
        .with_jitter_factor(0.0)
}

pub fn model() -> ModelInfo {
    ModelInfo::new("claude-3-5-sonnet-20241022", 8192)
}

pub fn vendor_client(base_url: &str) -> AnthropicClient {
    AnthropicClient::builder()
        .api_key("sk-test")
        .base_url(base_url)
        .model(model())
        .retry_policy(fast_policy())
        .build()
        .unwrap()
}

pub fn hello() -> Vec<ConversationMessage> {
    vec![ConversationMessage::user("Hello")]
}

/// Messages API response with a single text block.
pub fn text_response(text: &str) -> Value {
    json!({
        "id": "msg_01XFDUDYJgAACzvnptvVoYEL",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-3-5-sonnet-20241022",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {
            "input_tokens": 10,
            "output_tokens": 15,
            "cache_creation_input_tokens": 0,
            "cache_read_input_tokens": 0
        }
    })
}

/// `{"type":"error","error":{...}}` envelope.
pub fn error_envelope(error_type: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "error": {"type": error_type, "message": message}
    })
}

/// Render events as an SSE body.
pub fn sse_body(events: &[Value]) -> String {
    events
        .iter()
        .map(|e| {
            let name = e["type"].as_str().unwrap_or("message");
            format!("event: {name}\ndata: {e}\n\n")
        })
        .collect()
}

/// A complete streamed text answer split into `chunks`.
pub fn text_stream(chunks: &[&str]) -> String {
    let mut events = vec![
        json!({"type": "message_start", "message": {"id": "msg_1", "model": "claude-3-5-sonnet-20241022", "usage": {"input_tokens": 12, "output_tokens": 1}}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "ping"}),
    ];
    for chunk in chunks {
        events.push(json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": chunk}}));
    }
    events.push(json!({"type": "content_block_stop", "index": 0}));
    events.push(json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 7}}));
    events.push(json!({"type": "message_stop"}));
    sse_body(&events)
}

/// Drain a stream into its events.
pub async fn collect(mut stream: ProviderEventStream) -> Vec<ProviderEvent> {
    let mut out = Vec::new();
    while let Some(event) = stream.recv().await {
        out.push(event);
    }
    out
}
