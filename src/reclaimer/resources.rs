use super::ReclaimError;
use crate::locking::LockKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Lifecycle of background-processed resources such as import jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// Statuses a resource can get stuck in
    pub const STALE_CANDIDATES: [ProcessingStatus; 2] = [Self::Pending, Self::Processing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Invalid processing status: {other}")),
        }
    }
}

/// A resource found stuck by `find_stale`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_kind: String,
    pub resource_id: String,
    pub tenant_id: String,
    pub status: ProcessingStatus,
    /// Start time, or creation time for resources that never started
    pub stale_since: DateTime<Utc>,
}

impl ResourceRef {
    /// Key the resource's processor holds while working on it
    pub fn lock_key(&self) -> LockKey {
        LockKey::resource(&self.tenant_id, &self.resource_id)
    }
}

#[async_trait]
pub trait StaleResourceRepository: Send + Sync + fmt::Debug {
    /// Resources in one of `statuses` whose start (or creation) time is
    /// before `older_than`, oldest first, at most `limit`
    async fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[ProcessingStatus],
        limit: u32,
    ) -> Result<Vec<ResourceRef>, ReclaimError>;

    /// Move `resource` to failed with `message`, only if it is still in the
    /// status and start time observed by the scan. Returns whether it changed.
    async fn mark_failed(&self, resource: &ResourceRef, message: &str) -> Result<bool, ReclaimError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    pub tenant_id: String,
    pub status: ProcessingStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl TrackedResource {
    fn stale_since(&self) -> DateTime<Utc> {
        self.started_at.unwrap_or(self.created_at)
    }
}

/// In-process resource table keyed by `(resource_kind, resource_id)`
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceStore {
    resources: Arc<Mutex<HashMap<(String, String), TrackedResource>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, resource_kind: &str, resource_id: &str, resource: TrackedResource) {
        self.resources
            .lock()
            .insert((resource_kind.to_string(), resource_id.to_string()), resource);
    }

    pub fn get(&self, resource_kind: &str, resource_id: &str) -> Option<TrackedResource> {
        self.resources
            .lock()
            .get(&(resource_kind.to_string(), resource_id.to_string()))
            .cloned()
    }

    pub fn set_status(&self, resource_kind: &str, resource_id: &str, status: ProcessingStatus) -> bool {
        match self
            .resources
            .lock()
            .get_mut(&(resource_kind.to_string(), resource_id.to_string()))
        {
            Some(resource) => {
                resource.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl StaleResourceRepository for InMemoryResourceStore {
    async fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[ProcessingStatus],
        limit: u32,
    ) -> Result<Vec<ResourceRef>, ReclaimError> {
        let mut stale: Vec<ResourceRef> = self
            .resources
            .lock()
            .iter()
            .filter(|(_, resource)| {
                statuses.contains(&resource.status) && resource.stale_since() < older_than
            })
            .map(|((kind, id), resource)| ResourceRef {
                resource_kind: kind.clone(),
                resource_id: id.clone(),
                tenant_id: resource.tenant_id.clone(),
                status: resource.status,
                stale_since: resource.stale_since(),
            })
            .collect();
        stale.sort_by_key(|resource| resource.stale_since);
        stale.truncate(limit as usize);
        Ok(stale)
    }

    async fn mark_failed(&self, resource: &ResourceRef, message: &str) -> Result<bool, ReclaimError> {
        let mut resources = self.resources.lock();
        let Some(stored) =
            resources.get_mut(&(resource.resource_kind.clone(), resource.resource_id.clone()))
        else {
            return Ok(false);
        };
        if stored.status != resource.status || stored.stale_since() != resource.stale_since {
            return Ok(false);
        }
        stored.status = ProcessingStatus::Failed;
        stored.error_message = Some(message.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tracked(status: ProcessingStatus, created_at: DateTime<Utc>) -> TrackedResource {
        TrackedResource {
            tenant_id: "t1".to_string(),
            status,
            started_at: None,
            created_at,
            error_message: None,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in ["pending", "processing", "completed", "failed"] {
            assert_eq!(status.parse::<ProcessingStatus>().unwrap().as_str(), status);
        }
        assert!("queued".parse::<ProcessingStatus>().is_err());
    }

    #[tokio::test]
    async fn test_find_stale_uses_start_time_when_present() {
        let store = InMemoryResourceStore::new();
        let now = Utc::now();
        let mut restarted = tracked(ProcessingStatus::Processing, now - Duration::hours(2));
        restarted.started_at = Some(now - Duration::minutes(1));
        store.upsert("import_job", "fresh", restarted);
        store.upsert("import_job", "stuck", tracked(ProcessingStatus::Pending, now - Duration::hours(1)));
        store.upsert("import_job", "done", tracked(ProcessingStatus::Completed, now - Duration::hours(3)));

        let stale = store
            .find_stale(now - Duration::minutes(10), &ProcessingStatus::STALE_CANDIDATES, 10)
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].resource_id, "stuck");
    }

    #[tokio::test]
    async fn test_mark_failed_requires_unchanged_resource() {
        let store = InMemoryResourceStore::new();
        let now = Utc::now();
        store.upsert("import_job", "a", tracked(ProcessingStatus::Processing, now - Duration::hours(1)));
        let stale = store
            .find_stale(now, &ProcessingStatus::STALE_CANDIDATES, 10)
            .await
            .unwrap();

        store.set_status("import_job", "a", ProcessingStatus::Completed);
        assert!(!store.mark_failed(&stale[0], "stale").await.unwrap());
        assert_eq!(
            store.get("import_job", "a").unwrap().status,
            ProcessingStatus::Completed
        );
    }
}
