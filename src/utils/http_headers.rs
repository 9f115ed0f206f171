//! HTTP Headers Utility
//!
//! Header construction for the vendor and gateway paths.

use crate::error::LlmError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

/// HTTP header builder for API requests
pub struct HttpHeaderBuilder {
    headers: HeaderMap,
}

impl HttpHeaderBuilder {
    /// Create a new header builder
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
        }
    }

    /// Add JSON content type
    pub fn with_json_content_type(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Set `Authorization` to `value` verbatim (no `Bearer ` prefix added).
    pub fn with_raw_authorization(mut self, value: &str) -> Result<Self, LlmError> {
        let mut value = HeaderValue::from_str(value)
            .map_err(|e| LlmError::Configuration(format!("Invalid API key format: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Add a header whose value is masked in debug output.
    pub fn with_secret_header(mut self, name: &'static str, value: &str) -> Result<Self, LlmError> {
        let mut header_value = HeaderValue::from_str(value)
            .map_err(|e| LlmError::Configuration(format!("Invalid API key format: {e}")))?;
        header_value.set_sensitive(true);
        self.headers
            .insert(HeaderName::from_static(name), header_value);
        Ok(self)
    }

    /// Add a custom header
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, LlmError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            LlmError::Configuration(format!("Invalid header name '{name}': {e}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            LlmError::Configuration(format!("Invalid header value for '{name}': {e}"))
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Append custom headers; repeated names keep every value.
    pub fn with_custom_headers(
        mut self,
        custom_headers: &HashMap<String, String>,
    ) -> Result<Self, LlmError> {
        for (key, value) in custom_headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                LlmError::Configuration(format!("Invalid header name '{key}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                LlmError::Configuration(format!("Invalid header value for '{key}': {e}"))
            })?;
            self.headers.append(header_name, header_value);
        }
        Ok(self)
    }

    /// Build the final HeaderMap
    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

impl Default for HttpHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
