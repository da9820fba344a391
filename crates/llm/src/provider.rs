//! LLM Provider Trait
//!
//! Defines the seam between the gateway and a concrete chat-completions backend.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{CompletionRequest, CompletionResponse, LlmError, LlmResult};
use uber_codegen_core::streaming::StreamChunk;

/// Trait that all LLM providers must implement.
///
/// Providers may fail freely; the gateway converts every failure into
/// "unavailable" before it reaches an agent.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send one request and wait for the complete response.
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse>;

    /// Stream a response, forwarding each `StreamChunk::TextDelta` on `tx`.
    ///
    /// Text already sent stays valid if this later returns `Err`.
    /// Terminal chunks are the caller's responsibility.
    async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> LlmResult<CompletionResponse>;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
