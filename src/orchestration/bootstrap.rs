//! External collaborators handed to [`OrchestrationCore::bootstrap`].
//!
//! Two presets cover the deployment modes: [`Collaborators::in_memory`] for
//! local runs and tests, [`Collaborators::postgres`] for production. Either
//! can be adjusted with the `with_*` builders before bootstrapping.
//!
//! [`OrchestrationCore::bootstrap`]: super::OrchestrationCore::bootstrap

use crate::analytics::{
    AnalyticsService, FeatureFlags, HttpAnalyticsClient, InMemoryFeatureFlags,
    InMemoryUsageHistory, UsageHistorySource,
};
use crate::config::OrchestrationConfig;
use crate::database::{PgImportJobRepository, PgWorkItemRepository};
use crate::error::Result;
use crate::events::{EventPublisher, Notifier};
use crate::reclaimer::{InMemoryResourceStore, StaleResourceRepository};
use crate::scheduler::{AnalyticsWorkload, InMemoryAnalyticsWorkload};
use crate::state_machine::{
    ArtworkStatus, InMemoryWorkItemStore, OrderRequestStatus, WorkItemRepository,
};
use crate::time::{system_time, SharedTimeProvider};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug)]
pub struct Collaborators {
    pub order_repository: Arc<dyn WorkItemRepository<OrderRequestStatus>>,
    pub artwork_repository: Arc<dyn WorkItemRepository<ArtworkStatus>>,
    pub resource_repository: Arc<dyn StaleResourceRepository>,
    pub analytics_service: Arc<dyn AnalyticsService>,
    pub usage_history: Arc<dyn UsageHistorySource>,
    pub feature_flags: Arc<dyn FeatureFlags>,
    pub analytics_workload: Arc<dyn AnalyticsWorkload>,
    pub notifier: Arc<dyn Notifier>,
    pub time: SharedTimeProvider,
}

impl Collaborators {
    /// In-process storage with the HTTP analytics client and a broadcast
    /// notifier
    pub fn in_memory(config: &OrchestrationConfig) -> Result<Self> {
        Ok(Self {
            order_repository: Arc::new(InMemoryWorkItemStore::<OrderRequestStatus>::new()),
            artwork_repository: Arc::new(InMemoryWorkItemStore::<ArtworkStatus>::new()),
            resource_repository: Arc::new(InMemoryResourceStore::new()),
            analytics_service: Arc::new(HttpAnalyticsClient::new(&config.analytics)?),
            usage_history: Arc::new(InMemoryUsageHistory::new()),
            feature_flags: Arc::new(InMemoryFeatureFlags::new()),
            analytics_workload: Arc::new(InMemoryAnalyticsWorkload::new()),
            notifier: Arc::new(EventPublisher::new(config.notifications.channel_capacity)),
            time: system_time(),
        })
    }

    /// Postgres-backed work items and import jobs over `pool`
    pub fn postgres(pool: PgPool, config: &OrchestrationConfig) -> Result<Self> {
        Ok(Self {
            order_repository: Arc::new(PgWorkItemRepository::<OrderRequestStatus>::new(pool.clone())),
            artwork_repository: Arc::new(PgWorkItemRepository::<ArtworkStatus>::new(pool.clone())),
            resource_repository: Arc::new(PgImportJobRepository::new(pool)),
            ..Self::in_memory(config)?
        })
    }

    pub fn with_order_repository(
        mut self,
        repository: Arc<dyn WorkItemRepository<OrderRequestStatus>>,
    ) -> Self {
        self.order_repository = repository;
        self
    }

    pub fn with_artwork_repository(
        mut self,
        repository: Arc<dyn WorkItemRepository<ArtworkStatus>>,
    ) -> Self {
        self.artwork_repository = repository;
        self
    }

    pub fn with_resource_repository(mut self, repository: Arc<dyn StaleResourceRepository>) -> Self {
        self.resource_repository = repository;
        self
    }

    pub fn with_analytics_service(mut self, service: Arc<dyn AnalyticsService>) -> Self {
        self.analytics_service = service;
        self
    }

    pub fn with_usage_history(mut self, history: Arc<dyn UsageHistorySource>) -> Self {
        self.usage_history = history;
        self
    }

    pub fn with_feature_flags(mut self, flags: Arc<dyn FeatureFlags>) -> Self {
        self.feature_flags = flags;
        self
    }

    pub fn with_analytics_workload(mut self, workload: Arc<dyn AnalyticsWorkload>) -> Self {
        self.analytics_workload = workload;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_time(mut self, time: SharedTimeProvider) -> Self {
        self.time = time;
        self
    }
}
