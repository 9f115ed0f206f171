//! Vendor Messages API transport.

use super::errors::classify_http_error;
use super::streaming::decode_sse_event;
use super::transformers::{AnthropicRequestTransformer, transform_response};
use super::transport::{MessagesTransport, WireEventStream};
use super::types::{MessagesResponse, WireRequest};
use crate::error::LlmError;
use crate::params::{ANTHROPIC_VERSION, ClientConfig, DEFAULT_BASE_URL, INTERLEAVED_THINKING_BETA};
use crate::types::ProviderResponse;
use crate::utils::{HttpHeaderBuilder, run_cancellable};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Talks to `{base}/v1/messages`.
pub struct MessagesApiTransport {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    url: String,
}

impl MessagesApiTransport {
    pub fn new(config: Arc<ClientConfig>, http: reqwest::Client) -> Self {
        let base = if config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.as_str()
        };
        let url = format!("{}/v1/messages", base.trim_end_matches('/'));
        Self { http, config, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Credential goes to `Authorization` when it carries a `Bearer ` prefix,
    /// otherwise to `x-api-key`. A caller-supplied `Authorization` header wins.
    fn headers(&self, request: &WireRequest, credential: &SecretString) -> Result<HeaderMap, LlmError> {
        let mut builder = HttpHeaderBuilder::new()
            .with_json_content_type()
            .with_header("anthropic-version", ANTHROPIC_VERSION)?;

        let key = credential.expose_secret();
        if !self.config.has_authorization_header() && !key.is_empty() {
            builder = if key.starts_with("Bearer ") {
                builder.with_raw_authorization(key)?
            } else {
                builder.with_secret_header("x-api-key", key)?
            };
        }
        if request.thinking.is_some() {
            builder = builder.with_header("anthropic-beta", INTERLEAVED_THINKING_BETA)?;
        }

        let mut headers = builder.with_custom_headers(&self.config.extra_headers)?.build();
        if request.stream {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }
        Ok(headers)
    }

    async fn post(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, LlmError> {
        let body = AnthropicRequestTransformer::new(&self.config).to_body(request)?;
        let headers = self.headers(request, credential)?;

        let mut builder = self.http.post(&self.url).headers(headers).json(&body);
        // Streams are bounded by cancellation rather than a total timeout.
        if !request.stream {
            builder = builder.timeout(self.config.timeout());
        }

        tracing::debug!(
            url = %self.url,
            model = %request.model,
            max_tokens = request.max_tokens,
            stream = request.stream,
            "Sending Anthropic request"
        );
        let response = run_cancellable(cancel, async { builder.send().await.map_err(LlmError::from) }).await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = run_cancellable(cancel, async {
                response.text().await.map_err(|e| {
                    LlmError::Transport(format!("failed to read error body (status {status}): {e}"))
                })
            })
            .await?;
            return Err(classify_http_error(status.as_u16(), &text, &headers));
        }
        Ok(response)
    }
}

#[async_trait]
impl MessagesTransport for MessagesApiTransport {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn send(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, LlmError> {
        let response = self.post(request, credential, cancel).await?;
        let parsed: MessagesResponse =
            run_cancellable(cancel, async {
                response.json::<MessagesResponse>().await.map_err(LlmError::from)
            })
            .await?;
        Ok(transform_response(parsed))
    }

    async fn open_stream(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<WireEventStream, LlmError> {
        let response = self.post(request, credential, cancel).await?;
        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(|item| async move {
                match item {
                    Ok(event) => decode_sse_event(&event),
                    Err(e) => Some(Err(LlmError::Transport(format!("SSE stream error: {e}")))),
                }
            });
        Ok(Box::pin(events))
    }
}
