//! Built-in scheduled jobs.

use super::job::JobHandler;
use crate::analytics::{AnalyticsOperation, AnalyticsRouter, RoutedResult};
use crate::error::{OrchestrationError, Result};
use crate::reclaimer::StaleResourceReclaimer;
use crate::state_machine::{ArtworkStateMachine, OrderRequestStateMachine};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Breach and warning sweep over both workflow variants
pub struct SlaSweepJob {
    orders: Arc<OrderRequestStateMachine>,
    artwork: Arc<ArtworkStateMachine>,
}

impl SlaSweepJob {
    pub fn new(orders: Arc<OrderRequestStateMachine>, artwork: Arc<ArtworkStateMachine>) -> Self {
        Self { orders, artwork }
    }
}

#[async_trait]
impl JobHandler for SlaSweepJob {
    async fn run(&self) -> Result<()> {
        let order_breaches = self.orders.check_sla_breaches().await?;
        let artwork_breaches = self.artwork.check_sla_breaches().await?;
        let order_warnings = self.orders.check_sla_warnings().await?;
        let artwork_warnings = self.artwork.check_sla_warnings().await?;

        let flagged = order_breaches.len()
            + artwork_breaches.len()
            + order_warnings.len()
            + artwork_warnings.len();
        if flagged > 0 {
            info!(
                order_breaches = order_breaches.len(),
                artwork_breaches = artwork_breaches.len(),
                order_warnings = order_warnings.len(),
                artwork_warnings = artwork_warnings.len(),
                "SLA sweep flagged work items"
            );
        }
        Ok(())
    }
}

/// An item whose stockout prediction is refreshed by the recalculation job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecalculationTarget {
    pub tenant_id: String,
    pub item_id: String,
    pub current_stock: i64,
}

/// Source of recalculation targets and sink for their results
#[async_trait]
pub trait AnalyticsWorkload: Send + Sync + fmt::Debug {
    async fn targets(&self) -> Result<Vec<RecalculationTarget>>;

    async fn store(&self, target: &RecalculationTarget, result: RoutedResult) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAnalyticsWorkload {
    targets: Arc<DashMap<(String, String), i64>>,
    results: Arc<DashMap<(String, String), RoutedResult>>,
}

impl InMemoryAnalyticsWorkload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, tenant_id: &str, item_id: &str, current_stock: i64) {
        self.targets
            .insert((tenant_id.to_string(), item_id.to_string()), current_stock);
    }

    pub fn result(&self, tenant_id: &str, item_id: &str) -> Option<RoutedResult> {
        self.results
            .get(&(tenant_id.to_string(), item_id.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl AnalyticsWorkload for InMemoryAnalyticsWorkload {
    async fn targets(&self) -> Result<Vec<RecalculationTarget>> {
        let mut targets: Vec<RecalculationTarget> = self
            .targets
            .iter()
            .map(|entry| RecalculationTarget {
                tenant_id: entry.key().0.clone(),
                item_id: entry.key().1.clone(),
                current_stock: *entry.value(),
            })
            .collect();
        targets.sort_by(|a, b| (&a.tenant_id, &a.item_id).cmp(&(&b.tenant_id, &b.item_id)));
        Ok(targets)
    }

    async fn store(&self, target: &RecalculationTarget, result: RoutedResult) -> Result<()> {
        self.results
            .insert((target.tenant_id.clone(), target.item_id.clone()), result);
        Ok(())
    }
}

/// Refreshes stockout predictions through the analytics router.
///
/// A failing target does not stop the rest; the job reports failure when any
/// target failed so the scheduler records it.
pub struct AnalyticsRecalculationJob {
    router: Arc<AnalyticsRouter>,
    workload: Arc<dyn AnalyticsWorkload>,
    horizon_days: u32,
}

impl AnalyticsRecalculationJob {
    pub fn new(router: Arc<AnalyticsRouter>, workload: Arc<dyn AnalyticsWorkload>, horizon_days: u32) -> Self {
        Self {
            router,
            workload,
            horizon_days,
        }
    }
}

#[async_trait]
impl JobHandler for AnalyticsRecalculationJob {
    async fn run(&self) -> Result<()> {
        let targets = self.workload.targets().await?;
        let mut failures = 0usize;
        let mut degraded = 0usize;

        for target in &targets {
            let operation = AnalyticsOperation::StockoutPrediction {
                item_id: target.item_id.clone(),
                current_stock: target.current_stock,
                horizon_days: self.horizon_days,
            };
            let stored = match self.router.route(&target.tenant_id, &operation).await {
                Ok(result) => {
                    if result.degraded_reason.is_some() {
                        degraded += 1;
                    }
                    self.workload.store(target, result).await
                }
                Err(e) => Err(e.into()),
            };
            if let Err(e) = stored {
                failures += 1;
                warn!(
                    tenant_id = %target.tenant_id,
                    item_id = %target.item_id,
                    error = %e,
                    "Analytics recalculation failed for item"
                );
            }
        }

        info!(
            targets = targets.len(),
            failures,
            degraded,
            "Analytics recalculation completed"
        );
        if failures > 0 {
            return Err(OrchestrationError::Internal(format!(
                "{failures} of {} analytics targets failed",
                targets.len()
            )));
        }
        Ok(())
    }
}

pub struct StaleResourceReclaimJob {
    reclaimer: Arc<StaleResourceReclaimer>,
}

impl StaleResourceReclaimJob {
    pub fn new(reclaimer: Arc<StaleResourceReclaimer>) -> Self {
        Self { reclaimer }
    }
}

#[async_trait]
impl JobHandler for StaleResourceReclaimJob {
    async fn run(&self) -> Result<()> {
        self.reclaimer.reclaim().await?;
        Ok(())
    }
}
