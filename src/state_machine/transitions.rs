use super::states::WorkflowStatus;
use std::collections::{HashMap, HashSet, VecDeque};

/// Immutable `status → allowed next statuses` mapping for one variant
#[derive(Debug, Clone)]
pub struct TransitionTable<S: WorkflowStatus> {
    edges: HashMap<S, Vec<S>>,
}

impl<S: WorkflowStatus> TransitionTable<S> {
    /// Build the table from the variant's status enumeration
    pub fn for_variant() -> Self {
        let edges = S::all()
            .iter()
            .map(|&status| (status, status.allowed_transitions().to_vec()))
            .collect();
        Self { edges }
    }

    /// Allowed targets from `from`, in declaration order
    pub fn allowed(&self, from: S) -> &[S] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_valid(&self, from: S, to: S) -> bool {
        self.allowed(from).contains(&to)
    }

    pub fn terminal_statuses(&self) -> Vec<S> {
        S::all()
            .iter()
            .copied()
            .filter(|status| self.allowed(*status).is_empty())
            .collect()
    }

    /// Every status reachable from `start` through permitted transitions,
    /// `start` included
    pub fn reachable_from(&self, start: S) -> HashSet<S> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &next in self.allowed(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }
}

impl<S: WorkflowStatus> Default for TransitionTable<S> {
    fn default() -> Self {
        Self::for_variant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::states::{ArtworkStatus, OrderRequestStatus};

    #[test]
    fn test_order_table() {
        let table = TransitionTable::<OrderRequestStatus>::for_variant();
        assert!(table.is_valid(OrderRequestStatus::Draft, OrderRequestStatus::Submitted));
        assert!(!table.is_valid(OrderRequestStatus::Draft, OrderRequestStatus::Fulfilled));
        assert_eq!(
            table.allowed(OrderRequestStatus::Draft),
            &[OrderRequestStatus::Submitted, OrderRequestStatus::Cancelled]
        );
        assert_eq!(
            table.terminal_statuses(),
            vec![OrderRequestStatus::Fulfilled, OrderRequestStatus::Cancelled]
        );
    }

    #[test]
    fn test_every_status_reachable_from_initial() {
        let orders = TransitionTable::<OrderRequestStatus>::for_variant();
        assert_eq!(
            orders.reachable_from(OrderRequestStatus::Draft).len(),
            OrderRequestStatus::all().len()
        );

        let artwork = TransitionTable::<ArtworkStatus>::for_variant();
        assert_eq!(
            artwork.reachable_from(ArtworkStatus::Draft).len(),
            ArtworkStatus::all().len()
        );
    }

    #[test]
    fn test_terminal_reaches_only_itself() {
        let artwork = TransitionTable::<ArtworkStatus>::for_variant();
        let reachable = artwork.reachable_from(ArtworkStatus::Approved);
        assert_eq!(reachable.len(), 1);
    }
}
