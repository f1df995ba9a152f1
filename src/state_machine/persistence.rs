use super::errors::{PersistenceError, PersistenceResult, StateMachineResult};
use super::states::WorkflowStatus;
use super::work_item::{TransitionPlan, WorkItem};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Decides a transition from the item as read inside the storage transaction.
///
/// Returning an error aborts the transaction without writing anything.
pub type TransitionDecider<'a, S> =
    dyn Fn(&WorkItem<S>) -> StateMachineResult<TransitionPlan<S>> + Send + Sync + 'a;

/// Storage contract for one workflow variant
#[async_trait]
pub trait WorkItemRepository<S: WorkflowStatus>: Send + Sync + fmt::Debug {
    async fn insert_work_item(&self, item: &WorkItem<S>) -> PersistenceResult<()>;

    async fn load_work_item(&self, id: Uuid) -> PersistenceResult<WorkItem<S>>;

    /// Read-modify-write in a single transaction: load `id`, run `decide`
    /// against it, then persist the status update and its history row
    /// together. Nothing is written when `decide` fails.
    async fn save_transition(
        &self,
        id: Uuid,
        decide: &TransitionDecider<'_, S>,
    ) -> StateMachineResult<WorkItem<S>>;

    /// Items in an SLA-tracked status that are not yet flagged breached.
    /// With `overdue`, only those whose deadline is strictly before `now`.
    async fn find_sla_tracked(
        &self,
        overdue: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<WorkItem<S>>>;

    /// Tracked, unbreached, unwarned items due within `window` of `now`
    async fn find_sla_at_risk(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> PersistenceResult<Vec<WorkItem<S>>>;

    /// Flag those of `ids` that still match the overdue predicate at `now`;
    /// returns only the ids this call flipped. The predicate is re-checked
    /// atomically with the write, so an item transitioned since it was read
    /// is left alone.
    async fn mark_sla_breached(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<Uuid>>;

    /// Flag those of `ids` that are still at risk (see [`find_sla_at_risk`]);
    /// returns only the ids this call flipped
    ///
    /// [`find_sla_at_risk`]: WorkItemRepository::find_sla_at_risk
    async fn mark_sla_warned(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> PersistenceResult<Vec<Uuid>>;
}

/// Mutex-guarded in-process store.
///
/// Every operation runs under one lock, which gives `save_transition` the same
/// all-or-nothing behaviour as a database transaction.
#[derive(Debug)]
pub struct InMemoryWorkItemStore<S: WorkflowStatus> {
    items: Arc<Mutex<HashMap<Uuid, WorkItem<S>>>>,
}

impl<S: WorkflowStatus> InMemoryWorkItemStore<S> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<S: WorkflowStatus> Default for InMemoryWorkItemStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WorkflowStatus> Clone for InMemoryWorkItemStore<S> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

fn is_unbreached_tracked<S: WorkflowStatus>(item: &WorkItem<S>) -> bool {
    item.status.is_sla_tracked() && item.sla_deadline.is_some() && !item.sla_breached
}

fn is_overdue<S: WorkflowStatus>(item: &WorkItem<S>, now: DateTime<Utc>) -> bool {
    is_unbreached_tracked(item) && item.sla_deadline.is_some_and(|deadline| deadline < now)
}

fn is_at_risk<S: WorkflowStatus>(item: &WorkItem<S>, now: DateTime<Utc>, window: Duration) -> bool {
    is_unbreached_tracked(item)
        && !item.sla_warned
        && item
            .sla_deadline
            .is_some_and(|deadline| deadline >= now && deadline - now <= window)
}

#[async_trait]
impl<S: WorkflowStatus> WorkItemRepository<S> for InMemoryWorkItemStore<S> {
    async fn insert_work_item(&self, item: &WorkItem<S>) -> PersistenceResult<()> {
        self.items.lock().insert(item.id, item.clone());
        Ok(())
    }

    async fn load_work_item(&self, id: Uuid) -> PersistenceResult<WorkItem<S>> {
        self.items
            .lock()
            .get(&id)
            .cloned()
            .ok_or(PersistenceError::NotFound { id })
    }

    async fn save_transition(
        &self,
        id: Uuid,
        decide: &TransitionDecider<'_, S>,
    ) -> StateMachineResult<WorkItem<S>> {
        let mut items = self.items.lock();
        let item = items.get_mut(&id).ok_or(PersistenceError::NotFound { id })?;
        let plan = decide(item)?;
        item.apply(plan);
        Ok(item.clone())
    }

    async fn find_sla_tracked(
        &self,
        overdue: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<WorkItem<S>>> {
        Ok(self
            .items
            .lock()
            .values()
            .filter(|item| if overdue { is_overdue(item, now) } else { is_unbreached_tracked(item) })
            .cloned()
            .collect())
    }

    async fn find_sla_at_risk(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> PersistenceResult<Vec<WorkItem<S>>> {
        Ok(self
            .items
            .lock()
            .values()
            .filter(|item| is_at_risk(item, now, window))
            .cloned()
            .collect())
    }

    async fn mark_sla_breached(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<Uuid>> {
        let mut items = self.items.lock();
        Ok(ids
            .iter()
            .filter_map(|id| {
                let item = items.get_mut(id)?;
                if !is_overdue(item, now) {
                    return None;
                }
                item.sla_breached = true;
                Some(*id)
            })
            .collect())
    }

    async fn mark_sla_warned(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> PersistenceResult<Vec<Uuid>> {
        let mut items = self.items.lock();
        Ok(ids
            .iter()
            .filter_map(|id| {
                let item = items.get_mut(id)?;
                if !is_at_risk(item, now, window) {
                    return None;
                }
                item.sla_warned = true;
                Some(*id)
            })
            .collect())
    }
}
