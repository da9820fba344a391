//! Uber Code Generator LLM
//!
//! Everything between a stage agent and the chat-completions endpoint:
//! - `ModelGateway` - the never-failing `call` / `call_stream` front door
//! - `LlmProvider` - the provider seam, with an OpenAI-compatible implementation
//!   (Groq by default)
//! - the SSE streaming adapter and the HTTP client factory
//!
//! With the `test-util` feature, `ScriptedProvider` replaces the network for tests.

pub mod gateway;
pub mod http_client;
pub mod openai;
pub mod provider;
#[cfg(feature = "test-util")]
pub mod scripted;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use gateway::{GatewayStream, ModelGateway};
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
#[cfg(feature = "test-util")]
pub use scripted::{RecordedRequest, ScriptedProvider, ScriptedReply};
pub use streaming_adapters::OpenAIAdapter;
pub use types::*;
