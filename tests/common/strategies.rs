//! Proptest strategies over the workflow status enums

use inventory_orchestration::state_machine::{ArtworkStatus, OrderRequestStatus, WorkflowStatus};
use proptest::prelude::*;

pub fn order_status_strategy() -> impl Strategy<Value = OrderRequestStatus> {
    prop::sample::select(OrderRequestStatus::all().to_vec())
}

pub fn artwork_status_strategy() -> impl Strategy<Value = ArtworkStatus> {
    prop::sample::select(ArtworkStatus::all().to_vec())
}

/// Sequences of requested target statuses, valid or not
pub fn order_path_strategy(max_len: usize) -> impl Strategy<Value = Vec<OrderRequestStatus>> {
    prop::collection::vec(order_status_strategy(), 1..=max_len)
}
