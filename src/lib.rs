//! # anthropic-transport
//!
//! Transport layer for Claude models: request construction, retry with
//! backoff, context-overflow recovery and streaming event assembly over either
//! the vendor Messages API or an on-premise gateway.
//!
#![deny(unsafe_code)]

//! ## Quick Start
//!
//! ```rust,no_run
//! use anthropic_transport::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LlmError> {
//!     let client = AnthropicClient::builder()
//!         .api_key("your-api-key")
//!         .model(ModelInfo::new("claude-sonnet-4-20250514", 8192))
//!         .build()?;
//!
//!     let cancel = CancellationToken::new();
//!     let response = client
//!         .send(&[ConversationMessage::user("Hello!")], &[], &cancel)
//!         .await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```
//!
//! Streaming returns a `futures::Stream` of [`ProviderEvent`]s that always
//! ends with exactly one `Complete` or `Error`.

pub mod auth;
pub mod error;
pub mod params;
pub mod providers;
pub mod retry;
pub mod streaming;
pub mod types;
pub mod utils;

pub use error::{ErrorKind, LlmError};
pub use params::ClientConfig;
pub use providers::anthropic::{AnthropicClient, AnthropicClientBuilder};
pub use retry::{RetryDecision, RetryEngine, RetryPolicy};
pub use streaming::ProviderEventStream;
pub use types::*;

/// Commonly used items.
pub mod prelude {
    pub use crate::auth::{CredentialResolver, StaticCredential};
    pub use crate::error::{ErrorKind, LlmError};
    pub use crate::params::ClientConfig;
    pub use crate::providers::anthropic::{AnthropicClient, AnthropicClientBuilder};
    pub use crate::retry::RetryPolicy;
    pub use crate::streaming::ProviderEventStream;
    pub use crate::types::*;
    pub use tokio_util::sync::CancellationToken;
}
