//! Transport selection.
//!
//! A client talks either to the vendor Messages API or to an on-premise
//! gateway. The choice is made once, from the base URL, when the client is
//! built and never changes afterwards.

use super::gateway::GatewayTransport;
use super::sdk::MessagesApiTransport;
use super::streaming::StreamEvent;
use super::types::WireRequest;
use crate::error::LlmError;
use crate::params::ClientConfig;
use crate::types::ProviderResponse;
use async_trait::async_trait;
use futures::Stream;
use secrecy::SecretString;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Path suffix that identifies an on-premise gateway base URL.
pub const GATEWAY_PATH_SUFFIX: &str = "/v2/api/claude";

/// Decoded provider events of one streamed attempt.
pub type WireEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// One attempt against a Messages-shaped endpoint.
#[async_trait]
pub trait MessagesTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether failed attempts may be retried by the client.
    fn supports_retry(&self) -> bool {
        true
    }

    async fn send(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, LlmError>;

    async fn open_stream(
        &self,
        request: &WireRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<WireEventStream, LlmError>;
}

/// The transport chosen for a client.
pub enum Transport {
    Messages(MessagesApiTransport),
    Gateway(GatewayTransport),
}

impl Transport {
    /// Lowercase, drop trailing slashes, then match the gateway suffix.
    pub fn is_gateway_url(base_url: &str) -> bool {
        base_url
            .to_ascii_lowercase()
            .trim_end_matches('/')
            .ends_with(GATEWAY_PATH_SUFFIX)
    }

    pub fn select(config: Arc<ClientConfig>, http: reqwest::Client) -> Self {
        if Self::is_gateway_url(&config.base_url) {
            tracing::debug!(base_url = %config.base_url, "Using on-premise gateway transport");
            Self::Gateway(GatewayTransport::new(config, http))
        } else {
            Self::Messages(MessagesApiTransport::new(config, http))
        }
    }

    pub const fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }

    /// Endpoint URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Messages(t) => t.url(),
            Self::Gateway(t) => t.url(),
        }
    }

    pub fn as_dyn(&self) -> &dyn MessagesTransport {
        match self {
            Self::Messages(t) => t,
            Self::Gateway(t) => t,
        }
    }
}
