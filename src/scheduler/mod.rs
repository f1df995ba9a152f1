//! # Job Scheduler
//!
//! Named interval jobs driven by a fixed tick. A job runs at most once
//! concurrently across overlapping ticks: its body executes under the job's
//! lock from the shared [`LockRegistry`](crate::locking::LockRegistry), and a
//! tick that finds the lock held skips the job until the next tick.
//!
//! ```rust,no_run
//! use inventory_orchestration::config::SchedulerConfig;
//! use inventory_orchestration::locking::LockRegistry;
//! use inventory_orchestration::scheduler::{job_fn, JobScheduler};
//! use inventory_orchestration::time::system_time;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = Arc::new(JobScheduler::new(
//!     &SchedulerConfig::default(),
//!     LockRegistry::new(),
//!     system_time(),
//! ));
//! scheduler.register("heartbeat", 60_000, job_fn(|| async { Ok(()) }))?;
//! scheduler.start();
//! # scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod job;
pub mod job_scheduler;
pub mod jobs;

use crate::error::ErrorCategory;
use thiserror::Error;

pub use job::{job_fn, FnJobHandler, JobHandler, JobOutcome, JobStatus, TickReport};
pub use job_scheduler::JobScheduler;
pub use jobs::{
    AnalyticsRecalculationJob, AnalyticsWorkload, InMemoryAnalyticsWorkload,
    RecalculationTarget, SlaSweepJob, StaleResourceReclaimJob,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Job '{name}' is already registered")]
    DuplicateJob { name: String },

    #[error("Job '{name}' must have an interval greater than 0")]
    InvalidInterval { name: String },

    #[error("Job '{name}' is not registered")]
    UnknownJob { name: String },

    #[error("Job '{name}' is already running")]
    LockBusy { name: String },

    #[error("Job '{name}' failed: {reason}")]
    JobFailed { name: String, reason: String },
}

impl SchedulerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LockBusy { .. } => ErrorCategory::Transient,
            Self::UnknownJob { .. } => ErrorCategory::NotFound,
            Self::DuplicateJob { .. } | Self::InvalidInterval { .. } => ErrorCategory::Validation,
            Self::JobFailed { .. } => ErrorCategory::Infrastructure,
        }
    }
}
