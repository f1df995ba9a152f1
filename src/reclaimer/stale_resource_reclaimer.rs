use super::resources::{ProcessingStatus, ResourceRef, StaleResourceRepository};
use super::ReclaimError;
use crate::config::ReclaimerConfig;
use crate::events::{NotificationEvent, Notifier};
use crate::locking::LockRegistry;
use crate::time::SharedTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one reclaim pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimReport {
    /// Stale candidates returned by the scan
    pub scanned: usize,
    /// Candidates this pass moved to failed
    pub reclaimed: usize,
    /// Candidates that changed between scan and update, or failed to update
    pub skipped: usize,
    /// Resource locks that were actually held when force-released
    pub lock_keys_released: usize,
}

/// Fails resources stuck in pending/processing past the stale timeout and
/// frees the resource locks their processors held.
///
/// The failure update is conditional on the resource being unchanged since the
/// scan, so concurrent passes fail each resource at most once.
#[derive(Debug)]
pub struct StaleResourceReclaimer {
    repository: Arc<dyn StaleResourceRepository>,
    locks: LockRegistry,
    notifier: Arc<dyn Notifier>,
    time: SharedTimeProvider,
    config: ReclaimerConfig,
}

impl StaleResourceReclaimer {
    pub fn new(
        repository: Arc<dyn StaleResourceRepository>,
        locks: LockRegistry,
        notifier: Arc<dyn Notifier>,
        time: SharedTimeProvider,
        config: ReclaimerConfig,
    ) -> Self {
        Self {
            repository,
            locks,
            notifier,
            time,
            config,
        }
    }

    pub fn config(&self) -> &ReclaimerConfig {
        &self.config
    }

    pub async fn reclaim(&self) -> Result<ReclaimReport, ReclaimError> {
        let now = self.time.utc_now();
        let older_than = now - self.config.stale_timeout();

        let stale = self
            .repository
            .find_stale(
                older_than,
                &ProcessingStatus::STALE_CANDIDATES,
                self.config.batch_size,
            )
            .await?;

        let mut report = ReclaimReport {
            scanned: stale.len(),
            ..Default::default()
        };
        if stale.is_empty() {
            debug!("No stale resources detected this cycle");
            return Ok(report);
        }

        for resource in &stale {
            let message = self.diagnostic_message(resource);
            match self.repository.mark_failed(resource, &message).await {
                Ok(true) => {
                    report.reclaimed += 1;
                    if self.locks.force_release(&resource.lock_key()) {
                        report.lock_keys_released += 1;
                    }
                    warn!(
                        resource_kind = %resource.resource_kind,
                        resource_id = %resource.resource_id,
                        tenant_id = %resource.tenant_id,
                        previous_status = %resource.status,
                        stale_since = %resource.stale_since,
                        "Stale resource marked failed"
                    );
                    self.notifier.emit(NotificationEvent::StaleResourceRecovered {
                        resource_kind: resource.resource_kind.clone(),
                        resource_id: resource.resource_id.clone(),
                        tenant_id: resource.tenant_id.clone(),
                        stale_since: resource.stale_since,
                        message,
                    });
                }
                Ok(false) => {
                    report.skipped += 1;
                    debug!(
                        resource_id = %resource.resource_id,
                        "Resource progressed since scan; skipping"
                    );
                }
                Err(e) => {
                    report.skipped += 1;
                    error!(
                        resource_id = %resource.resource_id,
                        error = %e,
                        "Failed to mark stale resource as failed"
                    );
                }
            }
        }

        info!(
            scanned = report.scanned,
            reclaimed = report.reclaimed,
            skipped = report.skipped,
            lock_keys_released = report.lock_keys_released,
            "Stale resource reclaim completed"
        );
        Ok(report)
    }

    fn diagnostic_message(&self, resource: &ResourceRef) -> String {
        format!(
            "Marked failed by stale resource reclaimer: no progress in '{}' since {} (timeout {}s)",
            resource.status,
            resource.stale_since.to_rfc3339(),
            self.config.stale_timeout_seconds
        )
    }
}
