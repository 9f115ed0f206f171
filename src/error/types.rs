//! Core error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the transport.
///
/// `RateLimited` and `ContextOverflow` are normally absorbed by the retry loop;
/// they reach the caller only once retries are exhausted, wrapped in
/// `MaxRetriesExceeded`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// The credential was rejected (401).
    #[error("authentication failed (401): {0}")]
    Credential(String),

    /// The credential is valid but lacks permission (403).
    #[error("access forbidden (403): {0}")]
    Authorization(String),

    /// The configured endpoint does not exist (404).
    #[error("endpoint not found (404): {0}")]
    EndpointConfig(String),

    /// The upstream service failed (500).
    #[error("upstream service error ({status}): {message}")]
    UpstreamService { status: u16, message: String },

    /// Rate limited or overloaded (429, 529, or an overload marker in the message).
    #[error("rate limited ({status}): {message}")]
    RateLimited {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    /// Prompt plus requested output exceeds the model's context window.
    #[error("context overflow: {input_tokens} + {max_tokens} > {context_limit}")]
    ContextOverflow {
        input_tokens: u64,
        max_tokens: u64,
        context_limit: u64,
        message: String,
    },

    /// Any other non-success status, carrying the raw body.
    #[error("HTTP error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    /// The caller cancelled the call.
    #[error("request cancelled: {0}")]
    Cancelled(String),

    /// Network-level failure (connect, timeout, broken stream).
    #[error("network request failed: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A panic inside an attempt was caught and converted.
    #[error("internal fault: {0}")]
    InternalFault(String),

    /// Invalid client configuration (header values, URLs, missing credential).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The retry ceiling was reached; `last` is the error of the final attempt.
    #[error("maximum retry attempts reached: {max_retries} retries (last error: {last})")]
    MaxRetriesExceeded { max_retries: u32, last: Box<LlmError> },
}

/// Coarse classification of an [`LlmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Credential,
    Authorization,
    EndpointConfig,
    UpstreamService,
    RateLimited,
    ContextOverflow,
    Api,
    Cancelled,
    Transport,
    MalformedResponse,
    InternalFault,
    Configuration,
}

impl LlmError {
    /// The HTTP status reported by the provider, if this error carries one.
    ///
    /// Errors without a status are the "unrecognized shapes" the retry engine
    /// never retries.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Credential(_) => Some(401),
            Self::Authorization(_) => Some(403),
            Self::EndpointConfig(_) => Some(404),
            Self::UpstreamService { status, .. }
            | Self::RateLimited { status, .. }
            | Self::Api { status, .. } => Some(*status),
            Self::ContextOverflow { .. } => Some(400),
            _ => None,
        }
    }

    /// Provider message without the status prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::Credential(m)
            | Self::Authorization(m)
            | Self::EndpointConfig(m)
            | Self::Cancelled(m)
            | Self::Transport(m)
            | Self::MalformedResponse(m)
            | Self::InternalFault(m)
            | Self::Configuration(m) => m.clone(),
            Self::UpstreamService { message, .. }
            | Self::RateLimited { message, .. }
            | Self::ContextOverflow { message, .. }
            | Self::Api { message, .. } => message.clone(),
            Self::MaxRetriesExceeded { last, .. } => last.message(),
        }
    }

    /// Server-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } | Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Error kind. Exhausted retries report the kind of the last underlying error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Credential(_) => ErrorKind::Credential,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::EndpointConfig(_) => ErrorKind::EndpointConfig,
            Self::UpstreamService { .. } => ErrorKind::UpstreamService,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::ContextOverflow { .. } => ErrorKind::ContextOverflow,
            Self::Api { .. } => ErrorKind::Api,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Transport(_) => ErrorKind::Transport,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::InternalFault(_) => ErrorKind::InternalFault,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::MaxRetriesExceeded { last, .. } => last.kind(),
        }
    }

    /// Whether the retry loop handles this error internally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ContextOverflow { .. } | Self::Credential(_)
        )
    }

    /// Whether this error is a cancellation (directly or as the last retry cause).
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}
