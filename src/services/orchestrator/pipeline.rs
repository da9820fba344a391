//! Pipeline Orchestrator
//!
//! Runs classify -> [plan] -> generate -> validate -> test -> secure for one
//! request. The single-shot entry points return the finished run; the
//! streaming ones return the protocol events as they happen. Both drive the
//! same code, the only difference being whether the emitter has a channel.
//!
//! Every run ends in exactly one terminal event: `RUN_FINISHED`, or
//! `RUN_ERROR` when something outside the agents fails.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use uber_codegen_agents::{pipeline_stages, AgentContext};
use uber_codegen_core::{CodeArtifact, PipelineMode, StageKind};
use uber_codegen_llm::ModelGateway;

use super::state::{panic_message, RunState};
use crate::models::request::{EditRequest, GenerateRequest, RegenerateRequest};
use crate::models::run::{PipelineRun, RunPhase};
use crate::models::settings::AppConfig;
use crate::services::protocol::{new_id, EventEmitter, EventEncoder, ProtocolEvent};
use crate::services::sink::{NoopSink, ResultSink};
use crate::utils::error::AppResult;

/// Buffered events per streaming run
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a run starts from.
#[derive(Debug, Clone)]
enum Job {
    /// Classify, then generate from scratch
    Generate {
        prompt: String,
        generation_prompt: String,
    },
    /// Single-file generation from a rework prompt
    Regenerate { prompt: String },
    /// Analysis stages over caller-supplied code
    Analyze { code: String },
}

impl Job {
    fn prompt(&self) -> &str {
        match self {
            Job::Generate { prompt, .. } | Job::Regenerate { prompt } => prompt,
            Job::Analyze { .. } => "",
        }
    }

    fn initial_stages(&self) -> Vec<StageKind> {
        match self {
            Job::Generate { .. } => pipeline_stages(PipelineMode::Single),
            Job::Regenerate { .. } => pipeline_stages(PipelineMode::Single)
                .into_iter()
                .filter(|s| *s != StageKind::Classifier)
                .collect(),
            Job::Analyze { .. } => {
                vec![StageKind::Validator, StageKind::Tester, StageKind::Security]
            }
        }
    }
}

/// Per-request options shared by every entry point.
#[derive(Debug, Clone, Default)]
struct RunOptions {
    session_id: Option<String>,
    api_key: Option<String>,
}

#[derive(Clone)]
pub struct Pipeline {
    gateway: Arc<ModelGateway>,
    sink: Arc<dyn ResultSink>,
}

impl Pipeline {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            sink: Arc::new(NoopSink),
        }
    }

    /// Pipeline over a network gateway built from `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let gateway = ModelGateway::new(config.gateway.clone())?;
        Ok(Self::new(Arc::new(gateway)))
    }

    /// Record finished runs that carry a session id.
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Run the full pipeline and return the finished run.
    pub async fn run(&self, request: GenerateRequest) -> AppResult<PipelineRun> {
        request.validate()?;
        let (job, options) = generate_job(request);
        Ok(self.execute(job, options, None).await)
    }

    /// Run the full pipeline, streaming protocol events.
    pub fn run_streaming(
        &self,
        request: GenerateRequest,
    ) -> AppResult<ReceiverStream<ProtocolEvent>> {
        request.validate()?;
        let (job, options) = generate_job(request);
        Ok(self.spawn(job, options))
    }

    /// Rework existing code as a single-file run.
    pub async fn regenerate(&self, request: RegenerateRequest) -> AppResult<PipelineRun> {
        request.validate()?;
        let (job, options) = regenerate_job(request);
        Ok(self.execute(job, options, None).await)
    }

    pub fn regenerate_streaming(
        &self,
        request: RegenerateRequest,
    ) -> AppResult<ReceiverStream<ProtocolEvent>> {
        request.validate()?;
        let (job, options) = regenerate_job(request);
        Ok(self.spawn(job, options))
    }

    /// Apply the caller's edits, then run only the analysis stages.
    pub async fn run_agents_on_code(&self, request: EditRequest) -> AppResult<PipelineRun> {
        request.validate()?;
        let job = Job::Analyze {
            code: request.apply(),
        };
        let options = RunOptions {
            session_id: None,
            api_key: request.api_key,
        };
        Ok(self.execute(job, options, None).await)
    }

    fn spawn(&self, job: Job, options: RunOptions) -> ReceiverStream<ProtocolEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.execute(job, options, Some(tx)).await;
        });
        ReceiverStream::new(rx)
    }

    async fn execute(
        &self,
        job: Job,
        options: RunOptions,
        event_tx: Option<mpsc::Sender<ProtocolEvent>>,
    ) -> PipelineRun {
        let started = Instant::now();
        let encoder = match &options.session_id {
            Some(thread_id) => EventEncoder::new(thread_id.clone(), new_id("run")),
            None => EventEncoder::generate(),
        };
        let ctx = AgentContext::new(self.gateway.clone()).with_api_key(options.api_key.clone());
        let ai_available = ctx.is_ai_available();
        let emitter = EventEmitter::new(encoder.clone(), event_tx);
        let mut state = RunState::new(ctx, emitter, job.prompt(), &job.initial_stages());

        info!(
            "[Pipeline] run {} started (thread {}, model available: {})",
            encoder.run_id(),
            encoder.thread_id(),
            ai_available
        );
        state
            .emitter
            .emit(encoder.run_started(json!({ "prompt": job.prompt() })))
            .await;

        let outcome = AssertUnwindSafe(state.drive(&job)).catch_unwind().await;
        let failure = match outcome {
            Ok(()) => None,
            Err(payload) => Some(format!("pipeline crashed: {}", panic_message(payload.as_ref()))),
        };
        state
            .finish(started.elapsed().as_secs_f64(), failure)
            .await;

        let run = state.into_run();
        info!(
            "[Pipeline] run {} finished: phase={:?}, fixes={}, {:.2}s",
            run.run_id, run.phase, run.total_fixes, run.stats.total_duration
        );
        if options.session_id.is_some() {
            if let Err(e) = self.sink.record(&run).await {
                warn!("[Pipeline] failed to record run {}: {}", run.run_id, e);
            }
        }
        run
    }
}

fn generate_job(request: GenerateRequest) -> (Job, RunOptions) {
    let job = Job::Generate {
        generation_prompt: request.generation_prompt(),
        prompt: request.prompt,
    };
    let options = RunOptions {
        session_id: request.session_id,
        api_key: request.api_key,
    };
    (job, options)
}

fn regenerate_job(request: RegenerateRequest) -> (Job, RunOptions) {
    let job = Job::Regenerate {
        prompt: request.prompt(),
    };
    let options = RunOptions {
        session_id: None,
        api_key: request.api_key,
    };
    (job, options)
}

impl RunState {
    async fn drive(&mut self, job: &Job) {
        match job {
            Job::Generate {
                prompt,
                generation_prompt,
            } => {
                match self.classify(prompt).await {
                    PipelineMode::Single => self.generate_single(generation_prompt).await,
                    // Follow-up context only applies to single-file rework
                    PipelineMode::Multi => {
                        let plan = self.plan_project(prompt).await;
                        self.generate_project(prompt, &plan).await;
                    }
                }
            }
            Job::Regenerate { prompt } => self.generate_single(prompt).await,
            Job::Analyze { code } => {
                self.run.code = CodeArtifact::Single(code.clone());
                self.run.original_code = Some(CodeArtifact::Single(code.clone()));
            }
        }
        if self.run.code.is_empty() {
            self.warn_stage(StageKind::Generator, "generation produced no code")
                .await;
        }
        self.run_analysis_stages().await;
    }

    async fn finish(&mut self, total_duration: f64, failure: Option<String>) {
        if let Some(message) = &failure {
            for step in self.workflow.fail_active(message) {
                error!("[Pipeline] step {} failed: {}", step, message);
            }
        }
        self.run.workflow = self.workflow.steps().to_vec();
        self.run.finalize(total_duration);

        let message = match failure {
            None => {
                self.run.phase = RunPhase::Complete;
                match self.snapshot() {
                    Ok(snapshot) => {
                        self.emitter
                            .emit(self.encoder.state_snapshot(snapshot.clone()))
                            .await;
                        self.emitter.emit(self.encoder.run_finished(snapshot)).await;
                        return;
                    }
                    Err(e) => e.to_string(),
                }
            }
            Some(message) => message,
        };

        error!("[Pipeline] run {} failed: {}", self.run.run_id, message);
        self.run.phase = RunPhase::Error;
        self.run.error = Some(message.clone());
        self.emitter
            .emit(self.encoder.run_error(message, Some("pipeline_error")))
            .await;
    }
}
