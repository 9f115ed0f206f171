//! Anthropic Client Implementation
//!
//! Drives the attempt loop for both call shapes: every attempt rebuilds the
//! request from the call-local [`AttemptState`], hands it to the selected
//! transport, and on failure asks the [`RetryEngine`] whether to continue.

use super::builder::AnthropicClientBuilder;
use super::streaming::StreamAssembler;
use super::transformers::AnthropicRequestTransformer;
use super::transport::{Transport, WireEventStream};
use crate::auth::CredentialResolver;
use crate::error::LlmError;
use crate::params::ClientConfig;
use crate::retry::{RetryAction, RetryDecision, RetryEngine, RetryPolicy};
use crate::streaming::{EVENT_BUFFER, EventSink, ProviderEventStream};
use crate::types::{ConversationMessage, ProviderEvent, ProviderResponse, ToolDefinition};
use crate::utils::{guarded, make_cancellable_stream, run_cancellable, sleep_cancellable};
use futures::StreamExt;
use secrecy::SecretString;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// Per-call retry state. Never shared between concurrent calls.
#[derive(Debug, Clone, Copy)]
struct AttemptState {
    attempt: u32,
    adjusted_max_tokens: Option<u32>,
}

impl AttemptState {
    const fn new(adjusted_max_tokens: Option<u32>) -> Self {
        Self {
            attempt: 0,
            adjusted_max_tokens,
        }
    }
}

struct ClientInner {
    config: Arc<ClientConfig>,
    transport: Transport,
    engine: RetryEngine,
    resolver: Option<Arc<dyn CredentialResolver>>,
    credential: RwLock<SecretString>,
    /// Last budget learned from a context overflow; 0 when unset.
    adjusted_max_tokens: AtomicU32,
}

/// Anthropic Client
///
/// Cheap to clone; clones share the credential and the adjusted budget.
#[derive(Clone)]
pub struct AnthropicClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("transport", &self.inner.transport.as_dyn().name())
            .field("endpoint", &self.inner.transport.endpoint())
            .field("model", &self.inner.config.model.id)
            .field("reasoning_enabled", &self.inner.config.reasoning_enabled())
            .field("max_retries", &self.inner.engine.policy().max_retries)
            .field("has_resolver", &self.inner.resolver.is_some())
            .finish()
    }
}

impl AnthropicClient {
    pub(crate) fn from_parts(
        config: ClientConfig,
        http: reqwest::Client,
        policy: RetryPolicy,
        resolver: Option<Arc<dyn CredentialResolver>>,
    ) -> Self {
        let credential = config.api_key.clone();
        let config = Arc::new(config);
        let transport = Transport::select(Arc::clone(&config), http);
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                engine: RetryEngine::new(policy),
                resolver,
                credential: RwLock::new(credential),
                adjusted_max_tokens: AtomicU32::new(0),
            }),
        }
    }

    pub fn builder() -> AnthropicClientBuilder {
        AnthropicClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.inner.engine.policy()
    }

    /// Whether requests go to an on-premise gateway.
    pub fn is_gateway(&self) -> bool {
        self.inner.transport.is_gateway()
    }

    pub fn endpoint(&self) -> &str {
        self.inner.transport.endpoint()
    }

    /// Budget learned from the most recent context overflow, applied to
    /// later calls until reset.
    pub fn adjusted_max_tokens(&self) -> Option<u32> {
        self.inner.stored_budget()
    }

    pub fn reset_adjusted_max_tokens(&self) {
        self.inner.adjusted_max_tokens.store(0, Ordering::Relaxed);
    }

    /// Complete a conversation turn in one response.
    pub async fn send(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, LlmError> {
        self.inner.send(messages, tools, cancel).await
    }

    /// Stream a conversation turn.
    ///
    /// The returned stream yields incremental events and ends with exactly one
    /// `Complete` or `Error`. Must be called from within a Tokio runtime.
    pub fn stream(
        &self,
        messages: Vec<ConversationMessage>,
        tools: Vec<ToolDefinition>,
        cancel: CancellationToken,
    ) -> ProviderEventStream {
        let (sink, events) = ProviderEventStream::channel(EVENT_BUFFER);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = guarded(
                "anthropic stream",
                inner.run_stream(&messages, &tools, &cancel, &sink),
            )
            .await;
            if let Err(err) = outcome {
                tracing::debug!(error = %err, "Anthropic stream failed");
                sink.emit(ProviderEvent::Error(err)).await;
            }
        });
        events
    }
}

impl ClientInner {
    fn current_credential(&self) -> SecretString {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stored_budget(&self) -> Option<u32> {
        match self.adjusted_max_tokens.load(Ordering::Relaxed) {
            0 => None,
            budget => Some(budget),
        }
    }

    async fn send(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, LlmError> {
        let transformer = AnthropicRequestTransformer::new(&self.config);
        let transport = self.transport.as_dyn();
        let mut state = AttemptState::new(self.stored_budget());
        loop {
            state.attempt += 1;
            let request = transformer.build(messages, tools, state.adjusted_max_tokens, false);
            let credential = self.current_credential();
            tracing::debug!(
                attempt = state.attempt,
                transport = transport.name(),
                max_tokens = request.max_tokens,
                "Dispatching request"
            );
            match guarded("anthropic send", transport.send(&request, &credential, cancel)).await {
                Ok(response) => return Ok(response),
                Err(err) => self.prepare_retry(&mut state, err, cancel).await?,
            }
        }
    }

    async fn run_stream(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
        sink: &EventSink,
    ) -> Result<(), LlmError> {
        let transformer = AnthropicRequestTransformer::new(&self.config);
        let transport = self.transport.as_dyn();
        let mut state = AttemptState::new(self.stored_budget());
        loop {
            state.attempt += 1;
            let request = transformer.build(messages, tools, state.adjusted_max_tokens, true);
            let credential = self.current_credential();
            tracing::debug!(
                attempt = state.attempt,
                transport = transport.name(),
                max_tokens = request.max_tokens,
                "Opening stream"
            );
            let failure = match transport.open_stream(&request, &credential, cancel).await {
                Ok(wire) => match pump(wire, cancel, sink).await {
                    Ok(()) => return Ok(()),
                    Err(err) => err,
                },
                Err(err) => err,
            };
            self.prepare_retry(&mut state, failure, cancel).await?;
        }
    }

    /// Classify a failed attempt and apply its side effect. `Err` ends the call.
    async fn prepare_retry(
        &self,
        state: &mut AttemptState,
        err: LlmError,
        cancel: &CancellationToken,
    ) -> Result<(), LlmError> {
        if !self.transport.as_dyn().supports_retry() {
            return Err(err);
        }
        let rejected = err.clone();
        let (delay, action) = match self.engine.decide(state.attempt, err) {
            RetryDecision::Fail(err) => return Err(err),
            RetryDecision::Retry { delay, action } => (delay, action),
        };

        match action {
            RetryAction::Resend => {}
            RetryAction::RefreshCredential => self.refresh_credential(rejected.clone(), cancel).await?,
            RetryAction::ShrinkBudget(budget) => {
                state.adjusted_max_tokens = Some(budget);
                self.adjusted_max_tokens.store(budget, Ordering::Relaxed);
                tracing::debug!(max_tokens = budget, "Adjusted max_tokens after context overflow");
            }
        }

        tracing::warn!(
            attempt = state.attempt,
            max_retries = self.engine.policy().max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %rejected,
            "Retrying request"
        );
        sleep_cancellable(cancel, delay).await
    }

    async fn refresh_credential(&self, rejected: LlmError, cancel: &CancellationToken) -> Result<(), LlmError> {
        let Some(resolver) = &self.resolver else {
            return Err(rejected);
        };
        match run_cancellable(cancel, resolver.resolve()).await {
            Ok(fresh) => {
                *self.credential.write().unwrap_or_else(PoisonError::into_inner) = fresh;
                tracing::debug!("Credential refreshed after 401");
                Ok(())
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => Err(LlmError::Credential(format!(
                "failed to refresh credential: {}",
                err.message()
            ))),
        }
    }
}

/// Forward one attempt's events to the caller until a terminal event, the
/// end of the byte stream, an error, or cancellation.
async fn pump(wire: WireEventStream, cancel: &CancellationToken, sink: &EventSink) -> Result<(), LlmError> {
    let mut assembler = StreamAssembler::new();
    let wire = make_cancellable_stream(wire, cancel.clone());
    futures::pin_mut!(wire);
    while let Some(item) = wire.next().await {
        for event in assembler.push(item?)? {
            if !sink.emit(event).await {
                return Ok(());
            }
        }
        if assembler.is_complete() {
            return Ok(());
        }
    }
    if let Some(event) = assembler.finish() {
        sink.emit(event).await;
    }
    Ok(())
}
