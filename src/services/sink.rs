//! Result Sink
//!
//! Where finished runs go. Recording is best effort: the pipeline logs a
//! failing sink and still returns the run.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::run::PipelineRun;
use crate::utils::error::AppResult;

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, run: &PipelineRun) -> AppResult<()>;
}

/// Discards every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl ResultSink for NoopSink {
    async fn record(&self, _run: &PipelineRun) -> AppResult<()> {
        Ok(())
    }
}

/// Keeps runs in memory, newest last.
#[derive(Debug, Default)]
pub struct MemorySink {
    runs: Mutex<Vec<PipelineRun>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn runs(&self) -> Vec<PipelineRun> {
        self.runs.lock().await.clone()
    }

    /// Runs recorded under `thread_id`.
    pub async fn thread(&self, thread_id: &str) -> Vec<PipelineRun> {
        self.runs
            .lock()
            .await
            .iter()
            .filter(|r| r.thread_id == thread_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn record(&self, run: &PipelineRun) -> AppResult<()> {
        self.runs.lock().await.push(run.clone());
        Ok(())
    }
}
