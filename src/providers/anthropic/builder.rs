use super::client::AnthropicClient;
use crate::auth::CredentialResolver;
use crate::error::LlmError;
use crate::params::ClientConfig;
use crate::retry::RetryPolicy;
use crate::types::ModelInfo;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Anthropic client builder
///
/// Retry: pass `.retry_policy(RetryPolicy::new().with_max_retries(n))` to
/// change the ceiling or backoff; the defaults suit production use.
#[derive(Default)]
pub struct AnthropicClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<ModelInfo>,
    max_tokens: Option<u32>,
    reasoning: bool,
    disable_cache: bool,
    system_message: Option<String>,
    system_prompt_prefix: Option<String>,
    headers: HashMap<String, String>,
    extra_body: serde_json::Map<String, serde_json::Value>,
    timeout: Option<Duration>,
    gateway_timeout: Option<Duration>,
    retry_policy: RetryPolicy,
    credential_resolver: Option<Arc<dyn CredentialResolver>>,
    http_client: Option<reqwest::Client>,
    config: Option<ClientConfig>,
}

impl AnthropicClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a fully resolved configuration; later setters override it.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the API key
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL. A URL ending in `/v2/api/claude` selects the
    /// on-premise gateway transport.
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model
    pub fn model(mut self, model: ModelInfo) -> Self {
        self.model = Some(model);
        self
    }

    pub const fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Request a reasoning trace when the model supports it.
    pub const fn reasoning(mut self, enabled: bool) -> Self {
        self.reasoning = enabled;
        self
    }

    pub const fn disable_cache(mut self, disable: bool) -> Self {
        self.disable_cache = disable;
        self
    }

    /// Sets the system message
    pub fn system_message<S: Into<String>>(mut self, system: S) -> Self {
        self.system_message = Some(system.into());
        self
    }

    pub fn system_prompt_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.system_prompt_prefix = Some(prefix.into());
        self
    }

    /// Adds a header sent with every vendor request
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds a top-level field merged into every vendor request body
    pub fn extra_body<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.extra_body.insert(key.into(), value);
        self
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = Some(timeout);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Source of fresh credentials after a 401.
    pub fn credential_resolver(mut self, resolver: Arc<dyn CredentialResolver>) -> Self {
        self.credential_resolver = Some(resolver);
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, pools).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the Anthropic client
    pub fn build(self) -> Result<AnthropicClient, LlmError> {
        let mut config = match (self.config, self.model) {
            (Some(mut config), model) => {
                if let Some(model) = model {
                    config.model = model;
                }
                config
            }
            (None, Some(model)) => ClientConfig::new(String::new(), model),
            (None, None) => {
                return Err(LlmError::Configuration("model is required".to_string()));
            }
        };

        if let Some(key) = self.api_key {
            config.api_key = SecretString::from(key);
        }
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        config.reasoning |= self.reasoning;
        config.disable_cache |= self.disable_cache;
        if self.system_message.is_some() {
            config.system_message = self.system_message;
        }
        if self.system_prompt_prefix.is_some() {
            config.system_prompt_prefix = self.system_prompt_prefix;
        }
        config.extra_headers.extend(self.headers);
        config.extra_body.extend(self.extra_body);
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout.as_secs().max(1);
        }
        if let Some(timeout) = self.gateway_timeout {
            config.gateway_timeout_secs = timeout.as_secs().max(1);
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        Ok(AnthropicClient::from_parts(
            config,
            http_client,
            self.retry_policy,
            self.credential_resolver,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn model_is_required() {
        let err = AnthropicClientBuilder::new().api_key("k").build().unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
    }

    #[test]
    fn setters_override_config() {
        let mut base = ClientConfig::new("from-config", ModelInfo::new("m1", 1024));
        base.extra_headers.insert("x-a".into(), "1".into());

        let client = AnthropicClientBuilder::new()
            .config(base)
            .api_key("from-builder")
            .header("x-b", "2")
            .max_tokens(512)
            .reasoning(true)
            .gateway_timeout(Duration::from_secs(5))
            .retry_policy(RetryPolicy::new().with_max_retries(2))
            .build()
            .unwrap();

        let config = client.config();
        assert_eq!(config.api_key.expose_secret(), "from-builder");
        assert_eq!(config.extra_headers.len(), 2);
        assert_eq!(config.max_tokens, Some(512));
        assert!(config.reasoning);
        assert_eq!(config.gateway_timeout(), Duration::from_secs(5));
        assert_eq!(client.retry_policy().max_retries, 2);
    }

    #[test]
    fn gateway_url_selects_gateway() {
        let client = AnthropicClientBuilder::new()
            .model(ModelInfo::new("m", 1024))
            .base_url("https://corp.example/v2/api/claude")
            .build()
            .unwrap();
        assert!(client.is_gateway());
        assert_eq!(client.endpoint(), "https://corp.example/v2/api/claude/messages");
    }
}
