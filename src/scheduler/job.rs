use crate::error::Result;
use crate::time::duration_from_millis;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// Body of a scheduled job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self) -> Result<()>;
}

/// Adapter turning an async closure into a [`JobHandler`]
pub struct FnJobHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> JobHandler for FnJobHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(&self) -> Result<()> {
        (self.f)().await
    }
}

pub fn job_fn<F, Fut>(f: F) -> Arc<dyn JobHandler>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnJobHandler { f })
}

#[derive(Debug, Clone, Default)]
pub(crate) struct JobState {
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub failure_count: u64,
    pub running: bool,
}

/// A registered job: unique name, cadence and handler
pub(crate) struct RegisteredJob {
    pub name: String,
    pub interval_ms: u64,
    pub handler: Arc<dyn JobHandler>,
    pub state: parking_lot::Mutex<JobState>,
}

impl RegisteredJob {
    pub fn new(name: String, interval_ms: u64, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            name,
            interval_ms,
            handler,
            state: parking_lot::Mutex::new(JobState::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        duration_from_millis(self.interval_ms)
    }

    /// Never-run jobs are always due
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.state.lock().last_run {
            Some(last_run) => now - last_run >= self.interval(),
            None => true,
        }
    }

    pub fn status(&self) -> JobStatus {
        let state = self.state.lock().clone();
        JobStatus {
            name: self.name.clone(),
            interval_ms: self.interval_ms,
            next_due: state.last_run.map(|last_run| last_run + self.interval()),
            last_run: state.last_run,
            last_duration_ms: state.last_duration_ms,
            last_error: state.last_error,
            run_count: state.run_count,
            failure_count: state.failure_count,
            running: state.running,
        }
    }
}

/// Admin view of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub name: String,
    pub interval_ms: u64,
    /// Start time of the last successful run
    pub last_run: Option<DateTime<Utc>>,
    /// `None` until the first successful run
    pub next_due: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub failure_count: u64,
    pub running: bool,
}

/// What happened to one job during a tick or manual trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { duration_ms: u64 },
    Failed { duration_ms: u64, error: String },
    /// Another execution holds the job's lock
    Busy,
    NotDue,
}

/// Per-tick summary, by job name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub busy: Vec<String>,
    pub not_due: Vec<String>,
}

impl TickReport {
    pub(crate) fn record(&mut self, name: &str, outcome: &JobOutcome) {
        let bucket = match outcome {
            JobOutcome::Succeeded { .. } => &mut self.succeeded,
            JobOutcome::Failed { .. } => &mut self.failed,
            JobOutcome::Busy => &mut self.busy,
            JobOutcome::NotDue => &mut self.not_due,
        };
        bucket.push(name.to_string());
    }

    pub fn executed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
