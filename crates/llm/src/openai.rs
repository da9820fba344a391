//! OpenAI-Compatible Provider
//!
//! Implementation of the LlmProvider trait for chat-completions endpoints that
//! speak the OpenAI wire format. Groq is the default target.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{CompletionRequest, CompletionResponse, LlmError, LlmResult, UsageStats};
use crate::http_client::build_http_client;
use crate::streaming_adapters::OpenAIAdapter;
use uber_codegen_core::settings::GatewaySettings;
use uber_codegen_core::streaming::{StreamAdapter, StreamChunk};

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a provider for the endpoint and model in `settings`.
    pub fn new(settings: &GatewaySettings) -> LlmResult<Self> {
        let client = build_http_client(settings)?;
        Ok(Self {
            endpoint: settings.base_url.clone(),
            model: settings.model.clone(),
            client,
        })
    }

    /// Build the request body for the API
    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.instructions },
                { "role": "user", "content": request.input },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": stream,
        })
    }

    async fn post(&self, request: &CompletionRequest, stream: bool) -> LlmResult<reqwest::Response> {
        if request.api_key.is_empty() {
            return Err(missing_api_key_error(self.name()));
        }
        let body = self.build_request_body(request, stream);

        self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", request.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })
    }

    /// Parse a non-streaming response body
    fn parse_response(&self, response: ChatResponse) -> CompletionResponse {
        let choice = response.choices.into_iter().next();
        let stop_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let content = choice.and_then(|c| c.message).and_then(|m| m.content);

        CompletionResponse {
            content,
            stop_reason,
            usage: response
                .usage
                .map(|u| UsageStats {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
            model: response.model.unwrap_or_else(|| self.model.clone()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        let response = self.post(request, false).await?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(parsed))
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> LlmResult<CompletionResponse> {
        let response = self.post(request, true).await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        // Process SSE stream
        let mut adapter = OpenAIAdapter::new(&self.model);
        let mut accumulated = String::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = None;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        'frames: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            buffer.extend_from_slice(&chunk);

            for line in drain_lines(&mut buffer) {
                match adapter.adapt(&line) {
                    Ok(chunks) => {
                        for chunk in chunks {
                            match chunk {
                                StreamChunk::TextDelta { content } => {
                                    accumulated.push_str(&content);
                                    if tx.send(StreamChunk::TextDelta { content }).await.is_err() {
                                        debug!("[Gateway] stream consumer dropped, abandoning read");
                                        break 'frames;
                                    }
                                }
                                StreamChunk::Usage {
                                    input_tokens,
                                    output_tokens,
                                } => {
                                    usage = UsageStats {
                                        input_tokens,
                                        output_tokens,
                                    };
                                }
                                StreamChunk::Complete { stop_reason: reason } => {
                                    stop_reason = reason;
                                }
                                StreamChunk::Error { .. } => {}
                            }
                        }
                    }
                    Err(e) => {
                        debug!("[Gateway] skipping unparseable SSE frame: {}", e);
                    }
                }

                if adapter.is_done() {
                    break 'frames;
                }
            }
        }

        Ok(CompletionResponse {
            content: (!accumulated.is_empty()).then_some(accumulated),
            stop_reason,
            usage,
            model: self.model.clone(),
        })
    }
}

/// Non-streaming response format
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Remove and decode every complete line in `buffer`.
///
/// Bytes after the last newline stay buffered, so a multi-byte character split
/// across network chunks is decoded whole once its line completes.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = buffer.iter().rposition(|b| *b == b'\n') else {
        return Vec::new();
    };
    let complete: Vec<u8> = buffer.drain(..=last_newline).collect();
    complete
        .split(|b| *b == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim_end_matches('\r').to_string())
        .filter(|line| !line.trim().is_empty())
        .collect()
}
