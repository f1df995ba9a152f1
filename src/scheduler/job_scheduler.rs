//! # Job Scheduler
//!
//! Fixed-cadence driver over a registry of named interval jobs.
//!
//! Each tick runs on its own tokio task, so a slow handler can still be running
//! when the next tick fires. The per-job lock from the [`LockRegistry`] is what
//! keeps a job to one in-flight execution: a tick that finds the lock held
//! skips the job silently and the next tick retries.

use super::job::{JobHandler, JobOutcome, JobStatus, RegisteredJob, TickReport};
use super::SchedulerError;
use crate::config::SchedulerConfig;
use crate::locking::{LockKey, LockRegistry};
use crate::logging::{log_error, log_job_operation};
use crate::time::SharedTimeProvider;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub struct JobScheduler {
    jobs: RwLock<Vec<Arc<RegisteredJob>>>,
    locks: LockRegistry,
    time: SharedTimeProvider,
    tick_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("jobs", &self.job_names())
            .field("tick_interval", &self.tick_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl JobScheduler {
    pub fn new(config: &SchedulerConfig, locks: LockRegistry, time: SharedTimeProvider) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            jobs: RwLock::new(Vec::new()),
            locks,
            time,
            tick_interval: config.tick_interval(),
            shutdown_tx,
            driver: Mutex::new(None),
        }
    }

    /// Register a job. Duplicate names are rejected and the existing job is
    /// kept, so repeated module initialization is harmless.
    pub fn register(
        &self,
        name: &str,
        interval_ms: u64,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), SchedulerError> {
        if interval_ms == 0 {
            return Err(SchedulerError::InvalidInterval {
                name: name.to_string(),
            });
        }

        let mut jobs = self.jobs.write();
        if jobs.iter().any(|job| job.name == name) {
            warn!(job_name = %name, "Job already registered; ignoring duplicate registration");
            return Err(SchedulerError::DuplicateJob {
                name: name.to_string(),
            });
        }

        jobs.push(Arc::new(RegisteredJob::new(name.to_string(), interval_ms, handler)));
        info!(job_name = %name, interval_ms, "Registered scheduled job");
        Ok(())
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.read().iter().map(|job| job.name.clone()).collect()
    }

    pub fn job_statuses(&self) -> Vec<JobStatus> {
        self.jobs.read().iter().map(|job| job.status()).collect()
    }

    pub fn job_status(&self, name: &str) -> Option<JobStatus> {
        self.find(name).map(|job| job.status())
    }

    /// Run one driver tick: every due job whose lock is free, in registration
    /// order. Handler failures are recorded and never abort the tick.
    pub async fn run_tick(&self) -> TickReport {
        let jobs: Vec<Arc<RegisteredJob>> = self.jobs.read().clone();
        let mut report = TickReport::default();

        for job in jobs {
            let outcome = self.execute(&job, false).await;
            report.record(&job.name, &outcome);
        }

        if report.executed() > 0 {
            debug!(
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                busy = report.busy.len(),
                "Scheduler tick completed"
            );
        }
        report
    }

    /// Run `name` now regardless of its cadence, still honouring its lock
    pub async fn trigger(&self, name: &str) -> Result<JobStatus, SchedulerError> {
        let job = self.find(name).ok_or_else(|| SchedulerError::UnknownJob {
            name: name.to_string(),
        })?;

        match self.execute(&job, true).await {
            JobOutcome::Succeeded { .. } | JobOutcome::NotDue => Ok(job.status()),
            JobOutcome::Busy => Err(SchedulerError::LockBusy {
                name: name.to_string(),
            }),
            JobOutcome::Failed { error, .. } => Err(SchedulerError::JobFailed {
                name: name.to_string(),
                reason: error,
            }),
        }
    }

    /// Spawn the driver loop. Returns `false` when it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut driver = self.driver.lock();
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("Job scheduler already running");
            return false;
        }

        self.shutdown_tx.send_replace(false);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let scheduler = Arc::clone(self);

        *driver = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                tick_interval_ms = scheduler.tick_interval.as_millis() as u64,
                jobs = scheduler.jobs.read().len(),
                "Job scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let tick_scheduler = Arc::clone(&scheduler);
                        tokio::spawn(async move {
                            tick_scheduler.run_tick().await;
                        });
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Job scheduler stopped");
        }));
        true
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the driver loop. In-flight handlers are not cancelled; they finish
    /// and release their locks on their own.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Job scheduler driver terminated abnormally");
            }
        }
    }

    fn find(&self, name: &str) -> Option<Arc<RegisteredJob>> {
        self.jobs.read().iter().find(|job| job.name == name).cloned()
    }

    async fn execute(&self, job: &RegisteredJob, force: bool) -> JobOutcome {
        let token = match self.locks.try_acquire(LockKey::job(job.name.as_str())) {
            Ok(token) => token,
            Err(_) => {
                debug!(job_name = %job.name, "Job lock busy; skipping this cycle");
                return JobOutcome::Busy;
            }
        };

        let now = self.time.utc_now();
        if !force && !job.is_due(now) {
            self.locks.release(token);
            return JobOutcome::NotDue;
        }

        job.state.lock().running = true;
        let started = Instant::now();
        let result = AssertUnwindSafe(job.handler.run()).catch_unwind().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = {
            let mut state = job.state.lock();
            state.running = false;
            state.last_duration_ms = Some(duration_ms);
            match result {
                Ok(Ok(())) => {
                    state.last_run = Some(now);
                    state.run_count += 1;
                    state.last_error = None;
                    JobOutcome::Succeeded { duration_ms }
                }
                Ok(Err(e)) => {
                    state.failure_count += 1;
                    state.last_error = Some(e.to_string());
                    JobOutcome::Failed {
                        duration_ms,
                        error: e.to_string(),
                    }
                }
                Err(panic) => {
                    let message = format!("handler panicked: {}", panic_message(&panic));
                    state.failure_count += 1;
                    state.last_error = Some(message.clone());
                    JobOutcome::Failed {
                        duration_ms,
                        error: message,
                    }
                }
            }
        };

        match &outcome {
            JobOutcome::Succeeded { .. } => {
                log_job_operation(&job.name, "execute", "success", Some(duration_ms), None);
            }
            JobOutcome::Failed { error, .. } => {
                log_job_operation(&job.name, "execute", "failed", Some(duration_ms), Some(error));
                log_error("scheduler", &job.name, error, None);
            }
            JobOutcome::Busy | JobOutcome::NotDue => {}
        }

        self.locks.release(token);
        outcome
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use crate::scheduler::job::job_fn;
    use crate::time::ManualTimeProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler() -> (JobScheduler, ManualTimeProvider, LockRegistry) {
        let clock = ManualTimeProvider::starting_now();
        let locks = LockRegistry::new();
        let scheduler = JobScheduler::new(&SchedulerConfig::default(), locks.clone(), Arc::new(clock.clone()));
        (scheduler, clock, locks)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Arc<dyn JobHandler> {
        let counter = Arc::clone(counter);
        job_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let (scheduler, _, _) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(scheduler.register("x", 1000, counting(&counter)).is_ok());
        assert!(matches!(
            scheduler.register("x", 5000, counting(&counter)),
            Err(SchedulerError::DuplicateJob { .. })
        ));
        assert_eq!(scheduler.job_names(), vec!["x".to_string()]);
        assert_eq!(scheduler.job_status("x").unwrap().interval_ms, 1000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (scheduler, _, _) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(scheduler.register("x", 0, counting(&counter)).is_err());
    }

    #[tokio::test]
    async fn test_interval_gates_execution() {
        let (scheduler, clock, locks) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.register("x", 60_000, counting(&counter)).unwrap();

        assert_eq!(scheduler.run_tick().await.succeeded, vec!["x".to_string()]);
        assert_eq!(scheduler.run_tick().await.not_due, vec!["x".to_string()]);
        assert!(locks.is_empty());

        clock.advance(chrono::Duration::seconds(60));
        scheduler.run_tick().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_and_panicking_jobs_do_not_stop_tick() {
        let (scheduler, _, locks) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler
            .register(
                "fails",
                1000,
                job_fn(|| async { Err(OrchestrationError::Internal("boom".to_string())) }),
            )
            .unwrap();
        scheduler
            .register(
                "panics",
                1000,
                job_fn(|| async {
                    panic!("handler exploded");
                }),
            )
            .unwrap();
        scheduler.register("ok", 1000, counting(&counter)).unwrap();

        let report = scheduler.run_tick().await;
        assert_eq!(report.failed, vec!["fails".to_string(), "panics".to_string()]);
        assert_eq!(report.succeeded, vec!["ok".to_string()]);
        assert!(locks.is_empty());

        let status = scheduler.job_status("panics").unwrap();
        assert_eq!(status.last_run, None);
        assert!(status.last_error.unwrap().contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_trigger_unknown_and_busy() {
        let (scheduler, _, locks) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.register("x", 60_000, counting(&counter)).unwrap();

        assert!(matches!(
            scheduler.trigger("missing").await,
            Err(SchedulerError::UnknownJob { .. })
        ));

        let held = locks.try_acquire(LockKey::job("x")).unwrap();
        assert!(matches!(
            scheduler.trigger("x").await,
            Err(SchedulerError::LockBusy { .. })
        ));
        drop(held);

        let status = scheduler.trigger("x").await.unwrap();
        assert_eq!(status.run_count, 1);
        // A manual run counts as the last run for cadence purposes
        let status = scheduler.trigger("x").await.unwrap();
        assert_eq!(status.run_count, 2);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let (scheduler, _, _) = scheduler();
        let scheduler = Arc::new(scheduler);
        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());
        scheduler.shutdown().await;
        assert!(!scheduler.is_running());
    }
}
