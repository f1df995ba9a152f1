//! # Orchestration Core
//!
//! Owns every long-lived component of the process and is the single entry
//! point for wiring them: both the binary and the integration tests go through
//! [`OrchestrationCore::bootstrap`].

use super::bootstrap::Collaborators;
use crate::analytics::{AnalyticsRouter, LocalAnalytics};
use crate::config::OrchestrationConfig;
use crate::constants::{circuit_breaker::ANALYTICS_BREAKER_NAME, jobs};
use crate::error::Result;
use crate::events::Notifier;
use crate::locking::LockRegistry;
use crate::reclaimer::StaleResourceReclaimer;
use crate::resilience::{CircuitBreaker, CircuitBreakerStatus};
use crate::scheduler::{
    AnalyticsRecalculationJob, JobScheduler, JobStatus, SlaSweepJob, StaleResourceReclaimJob,
};
use crate::state_machine::{ArtworkStateMachine, OrderRequestStateMachine};
use crate::time::SharedTimeProvider;
use std::sync::Arc;
use tracing::info;

pub struct OrchestrationCore {
    pub config: OrchestrationConfig,
    pub locks: LockRegistry,
    pub notifier: Arc<dyn Notifier>,
    pub time: SharedTimeProvider,
    pub order_requests: Arc<OrderRequestStateMachine>,
    pub artwork: Arc<ArtworkStateMachine>,
    pub analytics: Arc<AnalyticsRouter>,
    pub reclaimer: Arc<StaleResourceReclaimer>,
    pub scheduler: Arc<JobScheduler>,
}

impl std::fmt::Debug for OrchestrationCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationCore")
            .field("scheduler", &self.scheduler)
            .field("analytics", &self.analytics)
            .finish()
    }
}

impl OrchestrationCore {
    /// Validate `config`, wire the components over `collaborators` and
    /// register the built-in jobs. Nothing runs until [`start`](Self::start).
    pub fn bootstrap(config: OrchestrationConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        info!("🔧 Bootstrapping orchestration core");

        let Collaborators {
            order_repository,
            artwork_repository,
            resource_repository,
            analytics_service,
            usage_history,
            feature_flags,
            analytics_workload,
            notifier,
            time,
        } = collaborators;

        let locks = LockRegistry::with_time(Arc::clone(&time));

        let order_requests = Arc::new(OrderRequestStateMachine::new(
            order_repository,
            Arc::clone(&notifier),
            Arc::clone(&time),
            &config.sla,
        ));
        let artwork = Arc::new(ArtworkStateMachine::new(
            artwork_repository,
            Arc::clone(&notifier),
            Arc::clone(&time),
            &config.sla,
        ));

        let breaker = Arc::new(
            CircuitBreaker::new(
                ANALYTICS_BREAKER_NAME,
                config.circuit_breaker.clone(),
                Arc::clone(&time),
            )
            .with_notifier(Arc::clone(&notifier)),
        );
        let analytics = Arc::new(AnalyticsRouter::new(
            analytics_service,
            LocalAnalytics::new(usage_history, Arc::clone(&time)),
            feature_flags,
            breaker,
            Arc::clone(&time),
            &config.analytics,
        ));

        let reclaimer = Arc::new(StaleResourceReclaimer::new(
            resource_repository,
            locks.clone(),
            Arc::clone(&notifier),
            Arc::clone(&time),
            config.reclaimer.clone(),
        ));

        let scheduler = Arc::new(JobScheduler::new(
            &config.scheduler,
            locks.clone(),
            Arc::clone(&time),
        ));
        scheduler.register(
            jobs::SLA_SWEEP,
            config.sla.sweep_interval_ms,
            Arc::new(SlaSweepJob::new(
                Arc::clone(&order_requests),
                Arc::clone(&artwork),
            )),
        )?;
        scheduler.register(
            jobs::ANALYTICS_RECALCULATION,
            config.analytics.recalculation_interval_ms,
            Arc::new(AnalyticsRecalculationJob::new(
                Arc::clone(&analytics),
                analytics_workload,
                config.analytics.default_horizon_days,
            )),
        )?;
        if config.reclaimer.enabled {
            scheduler.register(
                jobs::STALE_RESOURCE_RECLAIM,
                config.reclaimer.interval_ms,
                Arc::new(StaleResourceReclaimJob::new(Arc::clone(&reclaimer))),
            )?;
        } else {
            info!("Stale resource reclaimer disabled by configuration");
        }

        info!(jobs = ?scheduler.job_names(), "✅ Orchestration core ready");

        Ok(Self {
            config,
            locks,
            notifier,
            time,
            order_requests,
            artwork,
            analytics,
            reclaimer,
            scheduler,
        })
    }

    /// Start the scheduler driver; returns `false` if it was already running
    pub fn start(&self) -> bool {
        self.scheduler.start()
    }

    pub async fn shutdown(&self) {
        info!("🛑 Shutting down orchestration core");
        self.scheduler.shutdown().await;
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        self.analytics.circuit_breaker_status()
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        self.analytics.breaker()
    }

    pub fn job_statuses(&self) -> Vec<JobStatus> {
        self.scheduler.job_statuses()
    }
}
