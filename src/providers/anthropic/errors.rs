//! Anthropic error mapping.

use super::overflow::parse_context_overflow;
use super::types::{ApiErrorBody, ErrorEnvelope};
use crate::error::{LlmError, is_overload_message, retry_after_from_headers};
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Map a provider status and message onto the error taxonomy.
pub fn error_from_status(status: u16, message: String, retry_after: Option<Duration>) -> LlmError {
    match status {
        401 => LlmError::Credential(message),
        403 => LlmError::Authorization(message),
        404 => LlmError::EndpointConfig(message),
        400 => match parse_context_overflow(&message) {
            Some(o) => LlmError::ContextOverflow {
                input_tokens: o.input_tokens,
                max_tokens: o.max_tokens,
                context_limit: o.context_limit,
                message,
            },
            None => LlmError::Api {
                status,
                message,
                retry_after,
            },
        },
        429 | 529 => LlmError::RateLimited {
            status,
            message,
            retry_after,
        },
        _ if is_overload_message(&message) => LlmError::RateLimited {
            status,
            message,
            retry_after,
        },
        500 => LlmError::UpstreamService { status, message },
        _ => LlmError::Api {
            status,
            message,
            retry_after,
        },
    }
}

/// Classify a non-success vendor response.
pub fn classify_http_error(status: u16, body: &str, headers: &HeaderMap) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    error_from_status(status, message, retry_after_from_headers(headers))
}

/// Map an in-stream `error` event. The HTTP status was already 200, so the
/// status is derived from the error type.
pub fn map_stream_error(error: ApiErrorBody) -> LlmError {
    let status = match error.error_type.as_str() {
        "invalid_request_error" | "request_too_large" => 400,
        "authentication_error" => 401,
        "permission_error" => 403,
        "not_found_error" => 404,
        "rate_limit_error" => 429,
        "overloaded_error" => 529,
        _ => 500,
    };
    let message = if error.message.is_empty() {
        error.error_type
    } else {
        error.message
    };
    error_from_status(status, message, None)
}

/// Fixed status taxonomy of the on-premise gateway.
pub fn gateway_status_error(status: u16, body: &str) -> LlmError {
    match status {
        401 => LlmError::Credential("gateway rejected the credential".to_string()),
        403 => LlmError::Authorization("insufficient permissions".to_string()),
        404 => LlmError::EndpointConfig("gateway endpoint not found".to_string()),
        500 => LlmError::UpstreamService {
            status,
            message: "on-premise service issue".to_string(),
        },
        _ => LlmError::Api {
            status,
            message: body.to_string(),
            retry_after: None,
        },
    }
}
