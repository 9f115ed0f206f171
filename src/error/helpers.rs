//! User-facing error helpers.

use super::types::{ErrorKind, LlmError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Markers that flag a transient overload regardless of status code.
pub const OVERLOAD_MARKERS: &[&str] = &["overloaded", "rate limit exceeded"];

impl LlmError {
    /// Short actionable hint for the caller.
    pub fn hint(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Credential => "check credential",
            ErrorKind::Authorization => "check that the credential has access to this model",
            ErrorKind::EndpointConfig => "check endpoint configuration (base URL)",
            ErrorKind::UpstreamService => "the upstream service failed; try again later",
            ErrorKind::RateLimited => "rate limited or overloaded; reduce request rate",
            ErrorKind::ContextOverflow => "shorten the conversation or lower max_tokens",
            ErrorKind::Api => "inspect the status and response body",
            ErrorKind::Cancelled => "the call was cancelled by the caller",
            ErrorKind::Transport => "check network connectivity to the endpoint",
            ErrorKind::MalformedResponse => "the endpoint returned an unexpected payload",
            ErrorKind::InternalFault => "internal fault; please report with the error payload",
            ErrorKind::Configuration => "check client configuration",
        }
    }

    /// `Display` plus the hint, for logs and terminal output.
    pub fn user_message(&self) -> String {
        format!("{self} ({})", self.hint())
    }
}

/// Whether a provider message carries one of the overload markers.
pub fn is_overload_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    OVERLOAD_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse the first `Retry-After` header as whole seconds.
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn overload_marker_is_case_insensitive() {
        assert!(is_overload_message("Overloaded"));
        assert!(is_overload_message("upstream: Rate limit exceeded, retry"));
        assert!(!is_overload_message("invalid request"));
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(
            retry_after_from_headers(&headers),
            Some(Duration::from_secs(3))
        );

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_from_headers(&headers), None);
    }

    #[test]
    fn every_kind_has_a_hint() {
        let err = LlmError::EndpointConfig("missing".into());
        assert!(err.hint().contains("endpoint"));
        assert!(err.user_message().contains("check endpoint configuration"));
    }
}
