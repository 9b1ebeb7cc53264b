//! LLM provider abstraction
//!
//! The turn executor talks to the model through [`LlmService`], which yields
//! a stream of thinking and text deltas followed by the complete response for
//! the round. Only Anthropic is wired up; tests substitute scripted services.

mod anthropic;
mod error;
mod sse;
mod types;

pub use anthropic::AnthropicService;
pub use error::{LlmError, LlmErrorKind};
pub use types::*;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Stream of events for one model round
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmStreamEvent> + Send>>;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Start a streaming completion.
    ///
    /// Errors returned here happened before any output was produced. Errors
    /// after that arrive in-band as [`LlmStreamEvent::Failed`].
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// Gateway base URL; the gateway handles authentication
    pub gateway: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    /// Extended thinking budget in tokens, 0 disables thinking
    pub thinking_budget: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            thinking_budget: 10_000,
        }
    }
}

impl LlmConfig {
    /// Build the configured service wrapped in [`LoggingService`].
    ///
    /// Returns `Ok(None)` when no credentials are available; the server still
    /// starts and reports the model as unavailable on each turn.
    pub fn connect(&self) -> Result<Option<Arc<dyn LlmService>>, LlmError> {
        let api_key = if self.gateway.is_some() {
            "implicit".to_string()
        } else {
            match self.api_key.as_deref() {
                Some(key) if !key.is_empty() => key.to_string(),
                _ => return Ok(None),
            }
        };

        let service = AnthropicService::new(api_key, self)?;
        Ok(Some(Arc::new(LoggingService::new(Arc::new(service)))))
    }
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        let start = Instant::now();
        let model = self.model_id.clone();

        let stream = match self.inner.stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(
                    model = %model,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    retryable = e.is_retryable(),
                    "LLM request failed"
                );
                return Err(e);
            }
        };

        Ok(Box::pin(stream.inspect(move |event| match event {
            LlmStreamEvent::Completed(response) => {
                tracing::info!(
                    model = %model,
                    duration_ms = %start.elapsed().as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    tool_uses = response.tool_uses().len(),
                    "LLM request completed"
                );
            }
            LlmStreamEvent::Failed(e) => {
                tracing::error!(
                    model = %model,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    retryable = e.is_retryable(),
                    "LLM stream failed"
                );
            }
            LlmStreamEvent::ThinkingDelta(_) | LlmStreamEvent::TextDelta(_) => {}
        })))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
