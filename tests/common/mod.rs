//! Shared fixtures for integration tests.
//!
//! Every harness runs on in-memory storage, a manual clock and a recording
//! notifier so tests can move time and inspect emitted events.

#![allow(dead_code)]

pub mod strategies;

use inventory_orchestration::analytics::{
    AnalyticsService, InMemoryFeatureFlags, InMemoryUsageHistory,
};
use inventory_orchestration::config::OrchestrationConfig;
use inventory_orchestration::events::RecordingNotifier;
use inventory_orchestration::orchestration::{Collaborators, OrchestrationCore};
use inventory_orchestration::reclaimer::InMemoryResourceStore;
use inventory_orchestration::scheduler::InMemoryAnalyticsWorkload;
use inventory_orchestration::time::ManualTimeProvider;
use std::sync::Arc;

pub struct TestHarness {
    pub core: OrchestrationCore,
    pub clock: ManualTimeProvider,
    pub notifier: RecordingNotifier,
    pub resources: InMemoryResourceStore,
    pub usage: InMemoryUsageHistory,
    pub flags: InMemoryFeatureFlags,
    pub workload: InMemoryAnalyticsWorkload,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(OrchestrationConfig::default())
    }

    pub fn with_config(config: OrchestrationConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_analytics_service(
        config: OrchestrationConfig,
        service: Arc<dyn AnalyticsService>,
    ) -> Self {
        Self::build(config, Some(service))
    }

    fn build(config: OrchestrationConfig, service: Option<Arc<dyn AnalyticsService>>) -> Self {
        let clock = ManualTimeProvider::starting_now();
        let notifier = RecordingNotifier::new();
        let resources = InMemoryResourceStore::new();
        let usage = InMemoryUsageHistory::new();
        let flags = InMemoryFeatureFlags::new();
        let workload = InMemoryAnalyticsWorkload::new();

        let mut collaborators = Collaborators::in_memory(&config)
            .expect("in-memory collaborators")
            .with_time(Arc::new(clock.clone()))
            .with_notifier(Arc::new(notifier.clone()))
            .with_resource_repository(Arc::new(resources.clone()))
            .with_usage_history(Arc::new(usage.clone()))
            .with_feature_flags(Arc::new(flags.clone()))
            .with_analytics_workload(Arc::new(workload.clone()));
        if let Some(service) = service {
            collaborators = collaborators.with_analytics_service(service);
        }

        let core = OrchestrationCore::bootstrap(config, collaborators).expect("bootstrap");
        Self {
            core,
            clock,
            notifier,
            resources,
            usage,
            flags,
            workload,
        }
    }
}

/// Initialise test logging once; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("inventory_orchestration=debug")
        .with_test_writer()
        .try_init();
}
