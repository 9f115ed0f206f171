//! Error Handling Module
//!
//! This module provides error handling for the transport, including:
//! - Core error types (`LlmError`, `ErrorKind`)
//! - HTTP status classification and actionable hints
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use anthropic_transport::error::{ErrorKind, LlmError};
//!
//! let error = LlmError::EndpointConfig("no route".into());
//! assert_eq!(error.kind(), ErrorKind::EndpointConfig);
//! assert!(!error.is_retryable());
//! ```

mod conversions;
pub mod helpers;
pub mod types;

pub use helpers::*;
pub use types::*;
