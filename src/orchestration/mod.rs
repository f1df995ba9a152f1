//! # Orchestration
//!
//! Process-level wiring: [`Collaborators`] names the storage, analytics and
//! notification backends, and [`OrchestrationCore`] builds the state
//! machines, analytics router, reclaimer and scheduler over them.

pub mod bootstrap;
pub mod core;

pub use bootstrap::Collaborators;
pub use core::OrchestrationCore;
