//! Model Gateway
//!
//! The only door from a stage agent to the model. Both entry points are
//! infallible from the caller's view:
//!
//! - [`ModelGateway::call`] returns `Some(text)` or `None` ("unavailable")
//! - [`ModelGateway::call_stream`] returns a finite stream of [`StreamChunk`]s
//!   that always ends with exactly one terminal chunk (`Complete` or `Error`)
//!
//! A call whose credential fails the validity check never reaches the provider.
//! There are no retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::openai::OpenAIProvider;
use crate::provider::LlmProvider;
use crate::types::{CompletionRequest, LlmError, LlmResult};
use uber_codegen_core::settings::GatewaySettings;
use uber_codegen_core::streaming::StreamChunk;

/// Buffered fragments between the provider task and the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Lazy, finite, non-restartable sequence of stream chunks.
pub type GatewayStream = ReceiverStream<StreamChunk>;

/// Immutable gateway shared by every agent of a run.
pub struct ModelGateway {
    settings: GatewaySettings,
    provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .finish()
    }
}

impl ModelGateway {
    /// Gateway backed by the OpenAI-compatible HTTP provider.
    pub fn new(settings: GatewaySettings) -> LlmResult<Self> {
        let provider = OpenAIProvider::new(&settings)?;
        Ok(Self::with_provider(settings, Arc::new(provider)))
    }

    /// Gateway backed by any provider (tests use a scripted one).
    pub fn with_provider(settings: GatewaySettings, provider: Arc<dyn LlmProvider>) -> Self {
        Self { settings, provider }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// True when a call with this override would reach the provider.
    pub fn is_available(&self, api_key: Option<&str>) -> bool {
        self.settings.resolve_key(api_key).is_some()
    }

    fn request(
        &self,
        api_key: Option<&str>,
        instructions: &str,
        input: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Option<CompletionRequest> {
        if instructions.trim().is_empty() || input.trim().is_empty() {
            warn!("[Gateway] refusing call with empty instructions or input");
            return None;
        }
        let Some(key) = self.settings.resolve_key(api_key) else {
            debug!("[Gateway] no valid credential, skipping model call");
            return None;
        };
        Some(CompletionRequest {
            api_key: key,
            instructions: instructions.to_string(),
            input: input.to_string(),
            max_tokens,
            temperature,
        })
    }

    /// Single-shot completion at the analysis temperature.
    ///
    /// Any transport error, non-success status, empty body or timeout yields `None`.
    pub async fn call(
        &self,
        instructions: &str,
        input: &str,
        max_tokens: u32,
        api_key: Option<&str>,
    ) -> Option<String> {
        let request = self.request(
            api_key,
            instructions,
            input,
            max_tokens,
            self.settings.analysis_temperature,
        )?;
        let limit = self.settings.timeout();

        let outcome = match tokio::time::timeout(limit, self.provider.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error(limit)),
        };

        match outcome {
            Ok(response) => {
                debug!(
                    "[Gateway] call complete: model={} in={} out={}",
                    response.model, response.usage.input_tokens, response.usage.output_tokens
                );
                response.content.filter(|c| !c.trim().is_empty())
            }
            Err(e) => {
                warn!("[Gateway] call unavailable: {}", e);
                None
            }
        }
    }

    /// Streamed completion at the generation temperature.
    ///
    /// Fragments are produced by a background task. The stream always ends with
    /// one terminal chunk: `Complete` on success, `Error` on failure (including
    /// an invalid credential, in which case no fragment precedes it).
    pub fn call_stream(
        &self,
        instructions: &str,
        input: &str,
        max_tokens: u32,
        api_key: Option<&str>,
    ) -> GatewayStream {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        let Some(request) = self.request(
            api_key,
            instructions,
            input,
            max_tokens,
            self.settings.generation_temperature,
        ) else {
            // Capacity is non-zero and the receiver is alive, so this cannot block.
            let _ = tx.try_send(StreamChunk::error("model unavailable"));
            return ReceiverStream::new(rx);
        };

        let provider = Arc::clone(&self.provider);
        let limit = self.settings.stream_timeout();

        tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(limit, provider.stream(&request, tx.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(timeout_error(limit)),
                };

            let terminal = match outcome {
                Ok(response) => {
                    info!(
                        "[Gateway] stream complete: model={} out_tokens={}",
                        response.model, response.usage.output_tokens
                    );
                    StreamChunk::Complete {
                        stop_reason: response.stop_reason,
                    }
                }
                Err(e) => {
                    warn!("[Gateway] stream ended early: {}", e);
                    StreamChunk::error(e.to_string())
                }
            };
            let _ = tx.send(terminal).await;
        });

        ReceiverStream::new(rx)
    }
}

fn timeout_error(limit: Duration) -> LlmError {
    LlmError::Timeout {
        seconds: limit.as_secs(),
    }
}
