//! Transformers for Anthropic Claude
//!
//! Builds the wire request for one attempt and maps Messages API responses
//! back into [`ProviderResponse`].

use super::types::*;
use super::utils::{convert_messages, convert_tools};
use crate::error::LlmError;
use crate::params::ClientConfig;
use crate::types::{ConversationMessage, FinishReason, ProviderResponse, TokenUsage, ToolCall, ToolDefinition};

/// Share of `max_tokens` reserved for the reasoning trace.
pub const REASONING_SHARE: f64 = 0.8;

/// Smallest reasoning budget the provider accepts.
pub const MIN_THINKING_BUDGET: u32 = 1024;

/// Providers reject custom temperatures under extended reasoning.
pub const REASONING_TEMPERATURE: f32 = 1.0;

/// Request transformer for Anthropic
#[derive(Clone, Copy)]
pub struct AnthropicRequestTransformer<'a> {
    config: &'a ClientConfig,
}

impl<'a> AnthropicRequestTransformer<'a> {
    pub const fn new(config: &'a ClientConfig) -> Self {
        Self { config }
    }

    /// adjusted-from-overflow > explicit override > model default, never 0.
    pub fn resolve_max_tokens(&self, adjusted: Option<u32>) -> u32 {
        adjusted
            .filter(|t| *t > 0)
            .or(self.config.max_tokens.filter(|t| *t > 0))
            .unwrap_or(self.config.model.default_max_tokens)
            .max(1)
    }

    /// Assemble the request for one attempt.
    pub fn build(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
        adjusted: Option<u32>,
        stream: bool,
    ) -> WireRequest {
        let disable_cache = self.config.disable_cache;
        let (conversation_system, wire_messages) = convert_messages(messages, disable_cache);
        let max_tokens = self.resolve_max_tokens(adjusted);

        let mut thinking = None;
        let mut temperature = 0.0;
        if self.config.reasoning_enabled() {
            let budget = (f64::from(max_tokens) * REASONING_SHARE) as u32;
            if budget >= MIN_THINKING_BUDGET {
                thinking = Some(ThinkingConfig::enabled(budget));
                temperature = REASONING_TEMPERATURE;
            } else {
                tracing::debug!(max_tokens, "Reasoning budget below provider minimum; thinking disabled");
            }
        }

        let mut system = Vec::new();
        if let Some(prefix) = self.config.system_prompt_prefix.as_deref().filter(|p| !p.is_empty()) {
            system.push(SystemBlock::new(prefix));
        }
        if let Some(message) = self.config.system_message.as_deref().filter(|m| !m.is_empty()) {
            system.push(SystemBlock::new(message).cached(!disable_cache));
        }
        system.extend(conversation_system);

        WireRequest {
            model: self.config.model.id.clone(),
            max_tokens,
            temperature,
            system,
            messages: wire_messages,
            tools: convert_tools(tools, disable_cache),
            thinking,
            stream,
        }
    }

    /// Serialize `request` and merge the configured extra body fields.
    pub fn to_body(&self, request: &WireRequest) -> Result<serde_json::Value, LlmError> {
        let mut body = serde_json::to_value(request)?;
        if let Some(obj) = body.as_object_mut() {
            for (key, value) in &self.config.extra_body {
                obj.insert(key.clone(), value.clone());
            }
        }
        Ok(body)
    }
}

/// Response transformer: Messages API response → [`ProviderResponse`].
pub fn transform_response(response: MessagesResponse) -> ProviderResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in response.content {
        match block {
            ResponseContentBlock::Text { text } => content.push_str(&text),
            ResponseContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input.to_string()));
            }
            ResponseContentBlock::Thinking { .. } | ResponseContentBlock::Other => {}
        }
    }

    ProviderResponse {
        content,
        tool_calls,
        usage: usage_from_wire(&response.usage),
        finish_reason: response
            .stop_reason
            .as_deref()
            .map(FinishReason::from_stop_reason)
            .unwrap_or_default(),
    }
}

pub fn usage_from_wire(usage: &WireUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.input_tokens.unwrap_or(0),
        output_tokens: usage.output_tokens.unwrap_or(0),
        cache_creation_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
        cache_read_tokens: usage.cache_read_input_tokens.unwrap_or(0),
    }
}
