//! # Lock Registry
//!
//! Process-wide, non-blocking mutual exclusion keyed by resource identifier.
//! Scheduler jobs lock on their name; work-item processing locks on a numeric
//! key derived from the tenant and item ids so the reclaimer can free it.
//!
//! Acquisition never waits: a held key reports [`LockBusy`] immediately and the
//! caller skips its cycle. Tokens release on drop, so every exit path of the
//! owning operation (including panics and early returns) frees the key.

pub mod registry;

pub use registry::{LockBusy, LockKey, LockRegistry, LockSnapshot, LockToken};
