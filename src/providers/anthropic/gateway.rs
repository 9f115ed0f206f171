//! On-premise gateway transport.
//!
//! The gateway speaks a reduced, text-only Messages dialect over plain HTTP:
//! one non-streaming request per call, raw credential in `Authorization`, and
//! a fixed status taxonomy. Streaming is emulated from the single response.

use super::errors::gateway_status_error;
use super::streaming::{BlockDelta, MessageDeltaBody, StartBlock, StreamEvent, StreamMessage};
use super::transport::{MessagesTransport, WireEventStream};
use super::types::{WireRequest, WireUsage};
use crate::error::LlmError;
use crate::params::ClientConfig;
use crate::types::{FinishReason, ProviderResponse, TokenUsage};
use crate::utils::{HttpHeaderBuilder, cancelled_error, guarded};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    stream: bool,
    messages: Vec<GatewayMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

impl<'a> GatewayRequest<'a> {
    /// Text-only reduction of a Messages request. Messages without any text
    /// block (tool results, image-only turns) are dropped.
    fn from_wire(request: &'a WireRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .filter(|m| m.content.iter().any(|b| b.as_text().is_some()))
            .map(|m| GatewayMessage {
                role: &m.role,
                content: m.text(),
            })
            .collect();
        let system = request
            .system
            .iter()
            .map(|b| b.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            stream: false,
            messages,
            system: (!system.is_empty()).then_some(system),
        }
    }
}

/// A single HTTP exchange bound to a cancellation token at construction.
struct CancellableRequest {
    client: reqwest::Client,
    request: reqwest::Request,
    token: CancellationToken,
}

impl CancellableRequest {
    fn new(client: reqwest::Client, request: reqwest::Request, token: &CancellationToken) -> Self {
        Self {
            client,
            request,
            token: token.clone(),
        }
    }

    /// Send and read the full body, aborting as soon as the token fires.
    async fn execute(self) -> Result<(StatusCode, String), LlmError> {
        let Self {
            client,
            request,
            token,
        } = self;
        if token.is_cancelled() {
            return Err(cancelled_error());
        }
        let url = request.url().to_string();
        let exchange = async move {
            let response = client.execute(request).await.map_err(|e| {
                tracing::error!(error = %e, url = %url, "Gateway request failed");
                LlmError::Transport(format!("network request failed to {url}: {e}"))
            })?;
            let status = response.status();
            let body = response.text().await.map_err(LlmError::from)?;
            Ok::<_, LlmError>((status, body))
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(cancelled_error()),
            res = exchange => res,
        }
    }
}

/// Talks to `{base}/messages` on an on-premise gateway.
pub struct GatewayTransport {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    url: String,
}

impl GatewayTransport {
    pub fn new(config: Arc<ClientConfig>, http: reqwest::Client) -> Self {
        let base = config.base_url.strip_suffix('/').unwrap_or(&config.base_url);
        let url = format!("{base}/messages");
        Self { http, config, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn exchange(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, LlmError> {
        let key = credential.expose_secret();
        if key.is_empty() {
            return Err(LlmError::Credential(
                "API key is required for on-premise authentication".to_string(),
            ));
        }

        let headers = HttpHeaderBuilder::new()
            .with_json_content_type()
            .with_raw_authorization(key)?
            .build();
        let http_request = self
            .http
            .post(&self.url)
            .headers(headers)
            .timeout(self.config.gateway_timeout())
            .json(&GatewayRequest::from_wire(request))
            .build()?;

        tracing::debug!(url = %self.url, model = %request.model, "Sending gateway request");
        let (status, body) = CancellableRequest::new(self.http.clone(), http_request, cancel)
            .execute()
            .await?;

        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), body = %body, "Gateway API error");
            return Err(gateway_status_error(status.as_u16(), &body));
        }
        parse_envelope(&body)
    }
}

/// Tolerant parse of `{content:[{text}], usage:{input_tokens, output_tokens}}`.
fn parse_envelope(body: &str) -> Result<ProviderResponse, LlmError> {
    let value: Value = serde_json::from_str(body)?;
    let count = |pointer: &str| {
        value
            .pointer(pointer)
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
            .unwrap_or(0)
    };
    Ok(ProviderResponse {
        content: value
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        tool_calls: Vec::new(),
        usage: TokenUsage {
            input_tokens: count("/usage/input_tokens"),
            output_tokens: count("/usage/output_tokens"),
            ..Default::default()
        },
        finish_reason: FinishReason::EndTurn,
    })
}

/// Replay a complete response as the event sequence a streamed one produces.
fn replay_events(response: ProviderResponse) -> Vec<StreamEvent> {
    vec![
        StreamEvent::MessageStart {
            message: StreamMessage {
                usage: WireUsage {
                    input_tokens: Some(response.usage.input_tokens),
                    ..Default::default()
                },
                ..Default::default()
            },
        },
        StreamEvent::ContentBlockStart {
            index: 0,
            content_block: StartBlock::Text { text: String::new() },
        },
        StreamEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::TextDelta {
                text: response.content,
            },
        },
        StreamEvent::ContentBlockStop { index: 0 },
        StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some("end_turn".to_string()),
            },
            usage: Some(WireUsage {
                output_tokens: Some(response.usage.output_tokens),
                ..Default::default()
            }),
        },
        StreamEvent::MessageStop,
    ]
}

#[async_trait]
impl MessagesTransport for GatewayTransport {
    fn name(&self) -> &'static str {
        "anthropic-gateway"
    }

    fn supports_retry(&self) -> bool {
        false
    }

    async fn send(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, LlmError> {
        guarded("gateway send", self.exchange(request, credential, cancel)).await
    }

    async fn open_stream(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<WireEventStream, LlmError> {
        let response = self.send(request, credential, cancel).await?;
        let events = replay_events(response).into_iter().map(Ok);
        Ok(Box::pin(futures::stream::iter(events)))
    }
}
