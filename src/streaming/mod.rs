//! Event channel between a streaming call's background task and its caller.
//!
//! The producer side ([`EventSink`]) enforces that at most one terminal event
//! (`Complete` or `Error`) is ever delivered, and that nothing follows it.

use crate::error::LlmError;
use crate::types::{ProviderEvent, ProviderResponse};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Buffered events between producer and consumer.
pub const EVENT_BUFFER: usize = 64;

/// Receiving end of a streaming call. Ends after the terminal event.
pub struct ProviderEventStream {
    rx: mpsc::Receiver<ProviderEvent>,
}

impl ProviderEventStream {
    /// Create a connected sink/stream pair.
    pub fn channel(buffer: usize) -> (EventSink, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            EventSink {
                tx,
                terminated: AtomicBool::new(false),
            },
            Self { rx },
        )
    }

    /// Receive the next event, `None` once the producer is gone.
    pub async fn recv(&mut self) -> Option<ProviderEvent> {
        self.rx.recv().await
    }

    /// Drain the stream and return the terminal outcome.
    pub async fn into_response(mut self) -> Result<ProviderResponse, LlmError> {
        while let Some(event) = self.rx.recv().await {
            match event {
                ProviderEvent::Complete(response) => return Ok(response),
                ProviderEvent::Error(err) => return Err(err),
                _ => {}
            }
        }
        Err(LlmError::InternalFault(
            "event stream closed without a terminal event".to_string(),
        ))
    }
}

impl futures::Stream for ProviderEventStream {
    type Item = ProviderEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Producing end of a streaming call.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<ProviderEvent>,
    terminated: AtomicBool,
}

impl EventSink {
    /// Deliver `event`. Returns `false` when nothing more should be produced:
    /// the consumer is gone, a terminal event was already sent, or `event`
    /// itself was terminal.
    pub async fn emit(&self, event: ProviderEvent) -> bool {
        if event.is_terminal() {
            if self
                .terminated
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return false;
            }
            let _ = self.tx.send(event).await;
            return false;
        }
        if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// The consumer dropped its stream.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
