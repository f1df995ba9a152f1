use super::{
    actions::{plan_sla_update, LogTransitionAction, PublishTransitionEventAction, StateAction},
    errors::StateMachineResult,
    guards::{ReasonRequiredGuard, StateGuard, TransitionTableGuard},
    persistence::WorkItemRepository,
    sla::{hours_between, round_to_tenth, SlaPolicy, SlaStatus},
    states::{ArtworkStatus, OrderRequestStatus, WorkflowStatus},
    transitions::TransitionTable,
    work_item::{StatusHistoryEntry, TransitionOptions, TransitionPlan, WorkItem, WorkItemUpdate},
};
use crate::config::SlaConfig;
use crate::events::{NotificationEvent, Notifier};
use crate::time::SharedTimeProvider;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Guarded lifecycle engine shared by both work item variants
pub struct WorkflowStateMachine<S: WorkflowStatus> {
    repository: Arc<dyn WorkItemRepository<S>>,
    notifier: Arc<dyn Notifier>,
    time: SharedTimeProvider,
    table: TransitionTable<S>,
    policy: SlaPolicy,
    actions: Vec<Arc<dyn StateAction<S>>>,
}

pub type OrderRequestStateMachine = WorkflowStateMachine<OrderRequestStatus>;
pub type ArtworkStateMachine = WorkflowStateMachine<ArtworkStatus>;

impl<S: WorkflowStatus> WorkflowStateMachine<S> {
    pub fn new(
        repository: Arc<dyn WorkItemRepository<S>>,
        notifier: Arc<dyn Notifier>,
        time: SharedTimeProvider,
        sla_config: &SlaConfig,
    ) -> Self {
        let actions: Vec<Arc<dyn StateAction<S>>> = vec![
            Arc::new(LogTransitionAction),
            Arc::new(PublishTransitionEventAction::new(Arc::clone(&notifier))),
        ];
        Self {
            repository,
            notifier,
            time,
            table: TransitionTable::for_variant(),
            policy: SlaPolicy::for_kind(S::KIND, sla_config),
            actions,
        }
    }

    /// Append a post-commit action after the built-in log and publish actions
    pub fn with_action(mut self, action: Arc<dyn StateAction<S>>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn table(&self) -> &TransitionTable<S> {
        &self.table
    }

    pub fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    pub fn is_valid_transition(&self, from: S, to: S) -> bool {
        self.table.is_valid(from, to)
    }

    pub fn allowed_transitions(&self, from: S) -> &[S] {
        self.table.allowed(from)
    }

    /// Persist a new item in the variant's initial status
    pub async fn create(&self, tenant_id: &str, actor: &str) -> StateMachineResult<WorkItem<S>> {
        let item = WorkItem::new(tenant_id, actor, self.time.utc_now());
        self.repository.insert_work_item(&item).await?;
        debug!(
            kind = %S::KIND,
            item_id = %item.id,
            tenant_id = %tenant_id,
            "Created work item"
        );
        Ok(item)
    }

    pub async fn load(&self, id: Uuid) -> StateMachineResult<WorkItem<S>> {
        Ok(self.repository.load_work_item(id).await?)
    }

    /// Move item `id` into `to`.
    ///
    /// Guards run against the row read inside the repository transaction, and
    /// the status update and history row commit together. Post-commit actions
    /// only see committed transitions.
    pub async fn transition(
        &self,
        id: Uuid,
        to: S,
        actor: &str,
        options: TransitionOptions,
    ) -> StateMachineResult<WorkItem<S>> {
        let now = self.time.utc_now();
        let table_guard = TransitionTableGuard::new(&self.table);
        let policy = self.policy;

        let decide = |item: &WorkItem<S>| -> StateMachineResult<TransitionPlan<S>> {
            table_guard.check(item, to, &options)?;
            ReasonRequiredGuard.check(item, to, &options)?;

            let (sla, metadata) = plan_sla_update(item, to, now, &policy);
            Ok(TransitionPlan {
                update: WorkItemUpdate {
                    status: to,
                    sla,
                    updated_at: now,
                },
                history: StatusHistoryEntry {
                    from_status: Some(item.status),
                    to_status: to,
                    actor: actor.to_string(),
                    reason: options.reason.clone(),
                    metadata,
                    created_at: now,
                },
            })
        };

        let updated = self.repository.save_transition(id, &decide).await?;

        if let Some(entry) = updated.status_history.last() {
            for action in &self.actions {
                action.execute(&updated, entry);
            }
        }

        Ok(updated)
    }

    /// Flag every overdue tracked item as breached and notify once per item.
    ///
    /// Items flagged by an earlier sweep are excluded by the query, so repeated
    /// sweeps emit nothing new. Returns the ids flagged by this call.
    pub async fn check_sla_breaches(&self) -> StateMachineResult<Vec<Uuid>> {
        let now = self.time.utc_now();
        let overdue = self.repository.find_sla_tracked(true, now).await?;
        if overdue.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = overdue.iter().map(|item| item.id).collect();
        let flagged = self.repository.mark_sla_breached(&ids, now).await?;
        let flagged_set: HashSet<Uuid> = flagged.iter().copied().collect();

        for item in overdue.iter().filter(|item| flagged_set.contains(&item.id)) {
            let Some(deadline) = item.sla_deadline else {
                continue;
            };
            self.notifier.emit(NotificationEvent::SlaBreached {
                kind: S::KIND,
                item_id: item.id,
                tenant_id: item.tenant_id.clone(),
                status: item.status.to_string(),
                deadline,
                detected_at: now,
            });
        }

        info!(
            kind = %S::KIND,
            candidates = overdue.len(),
            breached = flagged.len(),
            "SLA breach sweep completed"
        );
        Ok(flagged)
    }

    /// Flag tracked items entering the warning window; idempotent like the
    /// breach sweep
    pub async fn check_sla_warnings(&self) -> StateMachineResult<Vec<Uuid>> {
        let now = self.time.utc_now();
        let window = self.policy.warning_window();
        let at_risk = self.repository.find_sla_at_risk(now, window).await?;
        if at_risk.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = at_risk.iter().map(|item| item.id).collect();
        let flagged = self.repository.mark_sla_warned(&ids, now, window).await?;
        let flagged_set: HashSet<Uuid> = flagged.iter().copied().collect();

        for item in at_risk.iter().filter(|item| flagged_set.contains(&item.id)) {
            let Some(deadline) = item.sla_deadline else {
                continue;
            };
            self.notifier.emit(NotificationEvent::SlaWarning {
                kind: S::KIND,
                item_id: item.id,
                tenant_id: item.tenant_id.clone(),
                status: item.status.to_string(),
                deadline,
                hours_remaining: round_to_tenth(hours_between(now, deadline)),
            });
        }

        debug!(kind = %S::KIND, warned = flagged.len(), "SLA warning sweep completed");
        Ok(flagged)
    }

    pub fn sla_status(&self, item: &WorkItem<S>, now: DateTime<Utc>) -> SlaStatus {
        SlaStatus::of(item, &self.policy, now)
    }
}

impl<S: WorkflowStatus> std::fmt::Debug for WorkflowStateMachine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStateMachine")
            .field("kind", &S::KIND)
            .field("policy", &self.policy)
            .field("actions", &self.actions.len())
            .finish()
    }
}
