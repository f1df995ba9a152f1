use super::sla::{is_overdue, SlaPolicy};
use super::states::{SlaEffect, WorkflowStatus};
use super::work_item::{SlaUpdate, StatusHistoryEntry, TransitionMetadata, WorkItem};
use crate::events::{NotificationEvent, Notifier};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// SLA consequence of moving `item` into `to` at `now`, plus the history
/// metadata describing it
pub fn plan_sla_update<S: WorkflowStatus>(
    item: &WorkItem<S>,
    to: S,
    now: DateTime<Utc>,
    policy: &SlaPolicy,
) -> (SlaUpdate, TransitionMetadata) {
    match to.sla_effect() {
        SlaEffect::Start => {
            let deadline = policy.deadline_from(now);
            (
                SlaUpdate::Started { deadline },
                TransitionMetadata::SlaStarted {
                    deadline,
                    window_hours: policy.window_hours,
                },
            )
        }
        SlaEffect::Resolve => {
            let breached = item
                .sla_deadline
                .is_some_and(|deadline| is_overdue(deadline, now));
            (
                SlaUpdate::Resolved { breached },
                TransitionMetadata::SlaResolved {
                    deadline: item.sla_deadline,
                    breached,
                },
            )
        }
        SlaEffect::Keep => (SlaUpdate::Unchanged, TransitionMetadata::StatusChange),
    }
}

/// Hook run after a transition has been committed
pub trait StateAction<S: WorkflowStatus>: Send + Sync {
    fn execute(&self, item: &WorkItem<S>, entry: &StatusHistoryEntry<S>);

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// Emit a `StatusChanged` notification for every committed transition
pub struct PublishTransitionEventAction {
    notifier: Arc<dyn Notifier>,
}

impl PublishTransitionEventAction {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl<S: WorkflowStatus> StateAction<S> for PublishTransitionEventAction {
    fn execute(&self, item: &WorkItem<S>, entry: &StatusHistoryEntry<S>) {
        self.notifier.emit(NotificationEvent::StatusChanged {
            kind: S::KIND,
            item_id: item.id,
            tenant_id: item.tenant_id.clone(),
            from: entry
                .from_status
                .map(|s| s.to_string())
                .unwrap_or_default(),
            to: entry.to_status.to_string(),
            actor: entry.actor.clone(),
            reason: entry.reason.clone(),
            occurred_at: entry.created_at,
        });
    }

    fn description(&self) -> &'static str {
        "Publish notification for work item transition"
    }
}

/// Structured log line for every committed transition
pub struct LogTransitionAction;

impl<S: WorkflowStatus> StateAction<S> for LogTransitionAction {
    fn execute(&self, item: &WorkItem<S>, entry: &StatusHistoryEntry<S>) {
        crate::logging::log_transition(
            S::KIND.as_str(),
            &item.id.to_string(),
            entry.from_status.map(|s| s.as_str()).unwrap_or("none"),
            entry.to_status.as_str(),
            &entry.actor,
        );
        if entry.to_status.is_terminal() {
            tracing::info!(
                kind = %S::KIND,
                item_id = %item.id,
                status = %entry.to_status,
                sla_breached = item.sla_breached,
                "Work item reached terminal status"
            );
        }
    }

    fn description(&self) -> &'static str {
        "Log work item transition"
    }
}
