use super::states::WorkflowStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant-owned order request or artwork review.
///
/// Mutated only through [`WorkflowStateMachine::transition`] and the SLA
/// sweeps; `status_history` is append-only.
///
/// [`WorkflowStateMachine::transition`]: super::WorkflowStateMachine::transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: WorkflowStatus")]
pub struct WorkItem<S: WorkflowStatus> {
    pub id: Uuid,
    pub tenant_id: String,
    pub status: S,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub sla_breached: bool,
    pub sla_warned: bool,
    pub status_history: Vec<StatusHistoryEntry<S>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<S: WorkflowStatus> WorkItem<S> {
    /// New item in the variant's initial status with its creation history row
    pub fn new(tenant_id: impl Into<String>, actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        let initial = S::initial();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            status: initial,
            sla_deadline: None,
            sla_breached: false,
            sla_warned: false,
            status_history: vec![StatusHistoryEntry {
                from_status: None,
                to_status: initial,
                actor: actor.into(),
                reason: None,
                metadata: TransitionMetadata::Created,
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a planned update in place and append its history row
    pub fn apply(&mut self, plan: TransitionPlan<S>) {
        let TransitionPlan { update, history } = plan;
        self.status = update.status;
        match update.sla {
            SlaUpdate::Unchanged => {}
            SlaUpdate::Started { deadline } => {
                self.sla_deadline = Some(deadline);
                self.sla_breached = false;
                self.sla_warned = false;
            }
            SlaUpdate::Resolved { breached } => {
                self.sla_breached = self.sla_breached || breached;
            }
        }
        self.updated_at = update.updated_at;
        self.status_history.push(history);
    }
}

/// One immutable row of a work item's status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: WorkflowStatus")]
pub struct StatusHistoryEntry<S: WorkflowStatus> {
    /// `None` only for the creation row
    pub from_status: Option<S>,
    pub to_status: S,
    pub actor: String,
    pub reason: Option<String>,
    pub metadata: TransitionMetadata,
    pub created_at: DateTime<Utc>,
}

/// Typed payload attached to a history row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionMetadata {
    Created,
    /// Plain status change with no SLA consequence
    StatusChange,
    SlaStarted {
        deadline: DateTime<Utc>,
        window_hours: f64,
    },
    SlaResolved {
        deadline: Option<DateTime<Utc>>,
        breached: bool,
    },
}

/// Change to the SLA fields produced by entering a status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlaUpdate {
    Unchanged,
    Started { deadline: DateTime<Utc> },
    Resolved { breached: bool },
}

/// Column-level update applied together with a history row
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItemUpdate<S: WorkflowStatus> {
    pub status: S,
    pub sla: SlaUpdate,
    pub updated_at: DateTime<Utc>,
}

/// Everything persisted atomically for one transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan<S: WorkflowStatus> {
    pub update: WorkItemUpdate<S>,
    pub history: StatusHistoryEntry<S>,
}

/// Caller-supplied context for a transition
#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    pub reason: Option<String>,
}

impl TransitionOptions {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::states::OrderRequestStatus;

    #[test]
    fn test_new_item_has_creation_row() {
        let now = Utc::now();
        let item = WorkItem::<OrderRequestStatus>::new("tenant-1", "alice", now);
        assert_eq!(item.status, OrderRequestStatus::Draft);
        assert_eq!(item.status_history.len(), 1);
        assert_eq!(item.status_history[0].from_status, None);
        assert_eq!(item.status_history[0].metadata, TransitionMetadata::Created);
    }

    #[test]
    fn test_apply_started_clears_flags() {
        let now = Utc::now();
        let mut item = WorkItem::<OrderRequestStatus>::new("tenant-1", "alice", now);
        item.sla_breached = true;
        item.sla_warned = true;

        let deadline = now + chrono::Duration::hours(24);
        item.apply(TransitionPlan {
            update: WorkItemUpdate {
                status: OrderRequestStatus::Submitted,
                sla: SlaUpdate::Started { deadline },
                updated_at: now,
            },
            history: StatusHistoryEntry {
                from_status: Some(OrderRequestStatus::Draft),
                to_status: OrderRequestStatus::Submitted,
                actor: "alice".to_string(),
                reason: None,
                metadata: TransitionMetadata::SlaStarted {
                    deadline,
                    window_hours: 24.0,
                },
                created_at: now,
            },
        });

        assert_eq!(item.sla_deadline, Some(deadline));
        assert!(!item.sla_breached);
        assert!(!item.sla_warned);
        assert_eq!(item.status_history.len(), 2);
    }
}
