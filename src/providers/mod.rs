//! Providers Module

pub mod anthropic;

pub use anthropic::{AnthropicClient, AnthropicClientBuilder};
