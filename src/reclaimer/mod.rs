//! # Stale Resource Reclaimer
//!
//! Background recovery for resources whose processor died or hung: anything
//! left in `pending`/`processing` past the stale timeout is marked `failed`
//! with a diagnostic message and its resource lock is force-released.

pub mod resources;
pub mod stale_resource_reclaimer;

use crate::state_machine::PersistenceError;
use thiserror::Error;

pub use resources::{
    InMemoryResourceStore, ProcessingStatus, ResourceRef, StaleResourceRepository,
    TrackedResource,
};
pub use stale_resource_reclaimer::{ReclaimReport, StaleResourceReclaimer};

#[derive(Error, Debug)]
pub enum ReclaimError {
    #[error("Stale resource storage error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Stale resource query failed: {reason}")]
    Query { reason: String },
}
