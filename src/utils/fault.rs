//! Internal-fault isolation.
//!
//! Panics raised while executing an attempt are caught at the call boundary
//! and surfaced as `LlmError::InternalFault` instead of unwinding into the
//! caller.

use crate::error::LlmError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Render a panic payload as text.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Await `future`, converting a panic into `InternalFault`.
pub async fn guarded<F, T>(scope: &'static str, future: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(scope, error = %message, "Panic recovered");
            Err(LlmError::InternalFault(format!("panic in {scope}: {message}")))
        }
    }
}
