//! Scripted Provider
//!
//! In-memory `LlmProvider` for tests. A responder closure decides the reply for
//! each request; every request is recorded so tests can assert on prompts,
//! budgets and call order.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::provider::LlmProvider;
use crate::types::{CompletionRequest, CompletionResponse, LlmError, LlmResult};
use uber_codegen_core::streaming::StreamChunk;

/// What the scripted model does with one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Return this text (streamed in chunks for `stream`)
    Text(String),
    /// Fail before producing anything
    Fail(String),
    /// Stream `text`, then fail with `error`
    Partial { text: String, error: String },
}

impl ScriptedReply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// One request as the provider saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub instructions: String,
    pub input: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub streamed: bool,
}

type Responder = dyn Fn(&RecordedRequest) -> ScriptedReply + Send + Sync;

pub struct ScriptedProvider {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
    chunk_size: usize,
}

impl ScriptedProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> ScriptedReply + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            chunk_size: 16,
        }
    }

    /// Reply with the same text to everything.
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| ScriptedReply::Text(text.clone()))
    }

    /// Fail every request.
    pub fn failing() -> Self {
        Self::new(|_| ScriptedReply::Fail("scripted outage".into()))
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn record(&self, request: &CompletionRequest, streamed: bool) -> ScriptedReply {
        let recorded = RecordedRequest {
            instructions: request.instructions.clone(),
            input: request.input.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            streamed,
        };
        let reply = (self.responder)(&recorded);
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(recorded);
        reply
    }

    async fn send_chunks(&self, text: &str, tx: &mpsc::Sender<StreamChunk>) {
        let chars: Vec<char> = text.chars().collect();
        for piece in chars.chunks(self.chunk_size) {
            let _ = tx.send(StreamChunk::text(piece.iter().collect::<String>())).await;
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        match self.record(request, false) {
            ScriptedReply::Text(text) => Ok(CompletionResponse {
                content: Some(text),
                stop_reason: Some("stop".into()),
                model: self.model().to_string(),
                ..Default::default()
            }),
            ScriptedReply::Fail(message) | ScriptedReply::Partial { error: message, .. } => {
                Err(LlmError::ServerError {
                    message,
                    status: Some(503),
                })
            }
        }
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> LlmResult<CompletionResponse> {
        match self.record(request, true) {
            ScriptedReply::Text(text) => {
                self.send_chunks(&text, &tx).await;
                Ok(CompletionResponse {
                    content: Some(text),
                    stop_reason: Some("stop".into()),
                    model: self.model().to_string(),
                    ..Default::default()
                })
            }
            ScriptedReply::Fail(message) => Err(LlmError::NetworkError { message }),
            ScriptedReply::Partial { text, error } => {
                self.send_chunks(&text, &tx).await;
                Err(LlmError::NetworkError { message: error })
            }
        }
    }
}
