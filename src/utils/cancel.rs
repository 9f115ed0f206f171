//! Cancellation utilities
//!
//! Every suspension point of a call (request submission, chunk receipt,
//! backoff sleep) races the caller's `CancellationToken` so cancellation aborts
//! the wait immediately.

use crate::error::LlmError;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Error returned when the token fires.
pub fn cancelled_error() -> LlmError {
    LlmError::Cancelled("context canceled".to_string())
}

/// Run `future` unless `token` fires first.
pub async fn run_cancellable<F, T>(token: &CancellationToken, future: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(cancelled_error()),
        res = future => res,
    }
}

/// Sleep for `delay`, returning early with `Cancelled` if `token` fires.
pub async fn sleep_cancellable(token: &CancellationToken, delay: Duration) -> Result<(), LlmError> {
    if delay.is_zero() {
        return if token.is_cancelled() {
            Err(cancelled_error())
        } else {
            Ok(())
        };
    }
    run_cancellable(token, async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}

// Stream-based cancellation is implemented via async_stream to avoid pin projection.

/// Wrap `stream` so that cancellation ends it with a single `Cancelled` error.
/// The inner stream is dropped as soon as the token fires.
pub fn make_cancellable_stream<S, T>(
    stream: S,
    token: CancellationToken,
) -> impl Stream<Item = Result<T, LlmError>> + Send
where
    S: Stream<Item = Result<T, LlmError>> + Unpin + Send,
    T: Send,
{
    async_stream::stream! {
        let mut inner = Some(stream);
        while let Some(source) = inner.as_mut() {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                item = source.next() => Some(item),
            };
            match next {
                None => {
                    inner = None;
                    yield Err(cancelled_error());
                }
                Some(Some(item)) => yield item,
                Some(None) => break,
            }
        }
    }
}
