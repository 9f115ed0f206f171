//! Client configuration.
//!
//! Values arrive already resolved (environment lookup and config files are the
//! caller's concern). `ClientConfig` is deserializable so a host application
//! can embed it in its own configuration file.

use crate::types::ModelInfo;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default vendor endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Messages API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Beta flag sent when extended reasoning is enabled.
pub const INTERLEAVED_THINKING_BETA: &str = "interleaved-thinking-2025-05-14";

const fn default_timeout_secs() -> u64 {
    600
}

const fn default_gateway_timeout_secs() -> u64 {
    60
}

/// Resolved configuration for one client instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Credential. A value starting with `Bearer ` is sent verbatim as `Authorization`.
    pub api_key: SecretString,
    /// Empty means the vendor default.
    #[serde(default)]
    pub base_url: String,
    pub model: ModelInfo,
    /// Explicit caller override for `max_tokens`.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Request a reasoning trace when the model supports it.
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default)]
    pub disable_cache: bool,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub system_prompt_prefix: Option<String>,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
    /// Top-level JSON fields merged into every vendor request body.
    #[serde(default)]
    pub extra_body: serde_json::Map<String, serde_json::Value>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, model: ModelInfo) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: String::new(),
            model,
            max_tokens: None,
            reasoning: false,
            disable_cache: false,
            system_message: None,
            system_prompt_prefix: None,
            extra_headers: HashMap::new(),
            extra_body: serde_json::Map::new(),
            timeout_secs: default_timeout_secs(),
            gateway_timeout_secs: default_gateway_timeout_secs(),
        }
    }

    /// Whether requests should carry a reasoning budget.
    pub const fn reasoning_enabled(&self) -> bool {
        self.model.can_reason && self.reasoning
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// `Authorization` present in the extra headers (any casing).
    pub fn has_authorization_header(&self) -> bool {
        self.extra_headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization"))
    }
}
