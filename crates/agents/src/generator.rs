//! Code Generator
//!
//! Streams source text for a single-file request or for one file of a planned
//! project. A [`GenerationStream`] yields text fragments as they arrive and
//! hides the fallback rules:
//!
//! - the model stream failed before any text: canned content is streamed in
//!   fixed-size fragments instead
//! - the model stream failed after some text: the partial text stands and the
//!   outcome is marked degraded

use std::collections::VecDeque;

use tokio_stream::StreamExt;
use tracing::warn;

use crate::agent::AgentContext;
use crate::prompts::{
    file_generation_input, FILE_GENERATION_BUDGET, FILE_GENERATION_SYSTEM, GENERATION_BUDGET,
    SINGLE_FILE_PROMPT,
};
use uber_codegen_core::plan::{FileSpec, ProjectPlan};
use uber_codegen_core::{FileBundle, StreamChunk};
use uber_codegen_llm::GatewayStream;

/// Fragment size used when streaming canned content.
pub const FALLBACK_FRAGMENT_CHARS: usize = 20;

const MOCK_PROMPT_CHARS: usize = 30;

/// How a generation stream ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Text came from the model
    pub ai_powered: bool,
    /// Fell back or stopped early
    pub degraded: bool,
    /// Why, when degraded
    pub warning: Option<String>,
}

enum StreamState {
    Model,
    Draining,
    Done,
}

/// Finite, non-restartable sequence of generated text fragments.
pub struct GenerationStream {
    source: GatewayStream,
    fallback: String,
    pending: VecDeque<String>,
    produced_text: bool,
    state: StreamState,
    outcome: GenerationOutcome,
}

impl GenerationStream {
    fn new(source: GatewayStream, fallback: String) -> Self {
        Self {
            source,
            fallback,
            pending: VecDeque::new(),
            produced_text: false,
            state: StreamState::Model,
            outcome: GenerationOutcome::default(),
        }
    }

    /// Next fragment, or `None` once the stream is exhausted.
    pub async fn next_fragment(&mut self) -> Option<String> {
        loop {
            match self.state {
                StreamState::Done => return None,
                StreamState::Draining => {
                    let next = self.pending.pop_front();
                    if next.is_none() {
                        self.state = StreamState::Done;
                    }
                    return next;
                }
                StreamState::Model => {}
            }

            match self.source.next().await {
                Some(StreamChunk::TextDelta { content }) => {
                    if content.is_empty() {
                        continue;
                    }
                    self.produced_text = true;
                    return Some(content);
                }
                Some(StreamChunk::Usage { .. }) => continue,
                Some(StreamChunk::Complete { .. }) => self.finish(None),
                Some(StreamChunk::Error { message, .. }) => self.finish(Some(message)),
                None => self.finish(Some("stream closed without a terminal chunk".into())),
            }
        }
    }

    fn finish(&mut self, error: Option<String>) {
        match (self.produced_text, error) {
            (true, None) => {
                self.outcome.ai_powered = true;
                self.state = StreamState::Done;
            }
            (true, Some(error)) => {
                warn!("[Generator] stream stopped early, keeping partial text: {}", error);
                self.outcome = GenerationOutcome {
                    ai_powered: true,
                    degraded: true,
                    warning: Some(format!("generation stopped early: {}", error)),
                };
                self.state = StreamState::Done;
            }
            (false, error) => {
                let reason = error.unwrap_or_else(|| "model returned no text".into());
                warn!("[Generator] no model text, streaming fallback content: {}", reason);
                self.pending = fragments(&self.fallback, FALLBACK_FRAGMENT_CHARS).into();
                self.outcome = GenerationOutcome {
                    ai_powered: false,
                    degraded: true,
                    warning: Some(format!("fallback content used: {}", reason)),
                };
                self.state = StreamState::Draining;
            }
        }
    }

    /// Final outcome. Meaningful once `next_fragment` has returned `None`.
    pub fn outcome(&self) -> &GenerationOutcome {
        &self.outcome
    }

    /// Drain the stream into one string.
    pub async fn collect_text(mut self) -> (String, GenerationOutcome) {
        let mut text = String::new();
        while let Some(fragment) = self.next_fragment().await {
            text.push_str(&fragment);
        }
        (text, self.outcome)
    }
}

/// Split `text` into pieces of at most `size` characters.
pub fn fragments(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

pub struct GeneratorAgent {
    ctx: AgentContext,
}

impl GeneratorAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Stream a single-file program for `prompt`.
    pub fn generate_single(&self, prompt: &str) -> GenerationStream {
        let source = self
            .ctx
            .call_stream(SINGLE_FILE_PROMPT, prompt, GENERATION_BUDGET);
        GenerationStream::new(source, mock_program(prompt))
    }

    /// Stream one file of a planned project. `generated` holds the files
    /// already produced, in plan order.
    pub fn generate_file(
        &self,
        prompt: &str,
        spec: &FileSpec,
        plan: &ProjectPlan,
        generated: &FileBundle,
    ) -> GenerationStream {
        let input = file_generation_input(prompt, spec, plan, generated);
        let source = self
            .ctx
            .call_stream(FILE_GENERATION_SYSTEM, &input, FILE_GENERATION_BUDGET);
        GenerationStream::new(source, fallback_file_content(spec))
    }
}

/// Canned program streamed when single-file generation is unavailable.
pub fn mock_program(prompt: &str) -> String {
    let summary: String = prompt.chars().take(MOCK_PROMPT_CHARS).collect();
    let summary = docstring_text(&summary);
    format!(
        "def solution(param1, param2):\n    \"\"\"Generated function for: {}...\"\"\"\n    result = param1 + param2\n    return result\n\nif __name__ == \"__main__\":\n    print(solution(10, 20))",
        summary
    )
}

/// `text` on one line with no quote or backslash that could end a docstring.
fn docstring_text(text: &str) -> String {
    single_line(text).replace('\\', "/").replace('"', "'")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal content for a planned file when generation is unavailable.
pub fn fallback_file_content(spec: &FileSpec) -> String {
    let path = spec.path.as_str();
    let purpose = single_line(&spec.purpose);
    let purpose = purpose.as_str();
    if path.ends_with(".md") {
        let title = if purpose.is_empty() { "Project" } else { purpose };
        return format!("# {}\n\nGenerated project.\n", title);
    }
    if path == "requirements.txt" {
        return "# Add your dependencies here\n".to_string();
    }
    if path.ends_with(".py") {
        return format!(
            "# {}\n# {}\n\ndef main():\n    \"\"\"Entry point.\"\"\"\n    pass\n\nif __name__ == \"__main__\":\n    main()\n",
            path, purpose
        );
    }
    format!("// {}\n// {}\n", path, purpose)
}
