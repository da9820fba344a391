//! OpenAI-Compatible SSE Stream Adapter
//!
//! Handles the chat-completions SSE format shared by OpenAI, Groq and other
//! compatible endpoints: `data: {json}` frames carrying `choices[].delta.content`,
//! terminated by a literal `data: [DONE]`.

use serde::Deserialize;
use uber_codegen_core::streaming::{AdapterError, StreamAdapter, StreamChunk};

#[derive(Debug, Deserialize)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    /// Groq reports usage under `x_groq.usage` on the final frame
    #[serde(default)]
    x_groq: Option<GroqExtension>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GroqExtension {
    #[serde(default)]
    usage: Option<Usage>,
}

/// Adapter for OpenAI-compatible SSE frames.
pub struct OpenAIAdapter {
    model: String,
    done: bool,
}

impl OpenAIAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            done: false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// True once the `[DONE]` sentinel was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl StreamAdapter for OpenAIAdapter {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<StreamChunk>, AdapterError> {
        let trimmed = input.trim();

        // SSE comments (": keep-alive") and event/id fields carry no payload
        if trimmed.is_empty() || trimmed.starts_with(':') {
            return Ok(vec![]);
        }
        let json_str = match trimmed.strip_prefix("data:") {
            Some(rest) => rest.trim_start(),
            None if trimmed.starts_with('{') => trimmed,
            None => return Ok(vec![]),
        };

        if json_str == "[DONE]" {
            self.done = true;
            return Ok(vec![]);
        }
        if json_str.is_empty() {
            return Ok(vec![]);
        }

        let event: ChunkEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut chunks = vec![];

        for choice in event.choices {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                if !content.is_empty() {
                    chunks.push(StreamChunk::TextDelta { content });
                }
            }
            if let Some(reason) = choice.finish_reason {
                chunks.push(StreamChunk::Complete {
                    stop_reason: Some(reason),
                });
            }
        }

        if let Some(usage) = event.usage.or(event.x_groq.and_then(|x| x.usage)) {
            chunks.push(StreamChunk::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }

        Ok(chunks)
    }

    fn reset(&mut self) {
        self.done = false;
    }
}
