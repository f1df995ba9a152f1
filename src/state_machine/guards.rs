use super::errors::{StateMachineError, StateMachineResult};
use super::states::WorkflowStatus;
use super::transitions::TransitionTable;
use super::work_item::{TransitionOptions, WorkItem};

/// Precondition checked against the item as read inside the transition's
/// transaction
pub trait StateGuard<S: WorkflowStatus>: Send + Sync {
    fn check(&self, item: &WorkItem<S>, to: S, options: &TransitionOptions) -> StateMachineResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Target must be listed in the variant's transition table
pub struct TransitionTableGuard<'a, S: WorkflowStatus> {
    table: &'a TransitionTable<S>,
}

impl<'a, S: WorkflowStatus> TransitionTableGuard<'a, S> {
    pub fn new(table: &'a TransitionTable<S>) -> Self {
        Self { table }
    }
}

impl<S: WorkflowStatus> StateGuard<S> for TransitionTableGuard<'_, S> {
    fn check(&self, item: &WorkItem<S>, to: S, _options: &TransitionOptions) -> StateMachineResult<()> {
        if self.table.is_valid(item.status, to) {
            return Ok(());
        }
        Err(StateMachineError::InvalidTransition {
            kind: S::KIND,
            from: item.status.to_string(),
            to: to.to_string(),
            allowed: self
                .table
                .allowed(item.status)
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
    }

    fn description(&self) -> &'static str {
        "Target status must be permitted by the transition table"
    }
}

/// Reason-required statuses need a non-blank reason
pub struct ReasonRequiredGuard;

impl<S: WorkflowStatus> StateGuard<S> for ReasonRequiredGuard {
    fn check(&self, _item: &WorkItem<S>, to: S, options: &TransitionOptions) -> StateMachineResult<()> {
        let has_reason = options
            .reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty());

        if to.requires_reason() && !has_reason {
            return Err(StateMachineError::MissingReason {
                status: to.to_string(),
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Entering this status requires a reason"
    }
}
