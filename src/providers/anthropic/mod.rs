//! Anthropic Provider Module
//!
//! Messages API client with two transports: the vendor API and the
//! on-premise gateway dialect.

pub mod builder;
pub mod client;
pub mod errors;
pub mod gateway;
pub mod overflow;
pub mod sdk;
pub mod streaming;
pub mod transformers;
pub mod transport;
pub mod types;
pub mod utils;

pub use builder::AnthropicClientBuilder;
pub use client::AnthropicClient;
pub use streaming::{StreamAssembler, StreamEvent};
pub use transport::{MessagesTransport, Transport};
