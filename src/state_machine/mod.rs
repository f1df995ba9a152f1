// Workflow state machines for client-facing work items
//
// One generic engine drives both variants (order requests and artwork
// reviews). Each variant supplies its status enum; the enum's transition
// enumeration is the only source of reachability.

pub mod actions;
pub mod errors;
pub mod guards;
pub mod persistence;
pub mod sla;
pub mod states;
pub mod transitions;
pub mod work_item;
pub mod workflow_state_machine;

// Re-export main types for convenient access
pub use errors::{PersistenceError, PersistenceResult, StateMachineError, StateMachineResult};
pub use persistence::{InMemoryWorkItemStore, TransitionDecider, WorkItemRepository};
pub use sla::{SlaPolicy, SlaState, SlaStatus};
pub use states::{ArtworkStatus, OrderRequestStatus, SlaEffect, WorkItemKind, WorkflowStatus};
pub use transitions::TransitionTable;
pub use work_item::{
    SlaUpdate, StatusHistoryEntry, TransitionMetadata, TransitionOptions, TransitionPlan,
    WorkItem, WorkItemUpdate,
};
pub use workflow_state_machine::{
    ArtworkStateMachine, OrderRequestStateMachine, WorkflowStateMachine,
};

// Common traits
pub use actions::StateAction;
pub use guards::StateGuard;
