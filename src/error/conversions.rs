//! Type Conversions for LlmError
//!
//! This module contains From trait implementations for converting
//! common error types into LlmError.

use super::types::LlmError;

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Transport(format!("request timed out: {err}"));
        }
        if err.is_decode() {
            return Self::MalformedResponse(err.to_string());
        }
        if err.is_builder() {
            return Self::Configuration(err.to_string());
        }
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
