//! Gateway Stream Chunks
//!
//! Provider-agnostic chunk types produced while a chat completion streams in.
//! Provider adapters in the LLM crate turn raw SSE lines into `StreamChunk`s;
//! the generator agent consumes them.

use serde::{Deserialize, Serialize};

/// One unit of a streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Token usage reported by the provider (usually on the last chunk)
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// The stream failed. Text already delivered stays valid.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// The provider signalled the end of the stream
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self::TextDelta {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Complete { .. })
    }
}

/// Errors raised while adapting raw provider lines.
#[derive(Debug, Clone)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Turns provider-specific stream lines into [`StreamChunk`]s.
pub trait StreamAdapter: Send + Sync {
    /// Returns the provider name for logging and identification.
    fn provider_name(&self) -> &'static str;

    /// Adapt a single raw stream line.
    ///
    /// A line may produce zero, one, or several chunks.
    fn adapt(&mut self, input: &str) -> Result<Vec<StreamChunk>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {}
}
