#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Inventory Orchestration
//!
//! Background orchestration core for a multi-tenant inventory platform.
//!
//! ## Overview
//!
//! The crate runs the work that happens between user requests:
//!
//! - a fixed-cadence **job scheduler** that guarantees at most one in-flight
//!   execution per job name through the in-process **lock registry**;
//! - **workflow state machines** for client order requests and artwork
//!   reviews, with an append-only status history and SLA deadline tracking;
//! - an **analytics router** that sends forecasts and stockout predictions to
//!   an external service behind a **circuit breaker**, degrading to a local
//!   weighted-average implementation;
//! - a **stale resource reclaimer** that fails resources stuck in processing
//!   and frees their locks.
//!
//! ## Module Organization
//!
//! - [`scheduler`] - Job registry, driver loop and built-in jobs
//! - [`locking`] - Named mutual-exclusion locks
//! - [`state_machine`] - Order request and artwork workflows, SLA tracking
//! - [`analytics`] - External client, local fallback and routing facade
//! - [`resilience`] - Circuit breaker
//! - [`reclaimer`] - Stale resource recovery
//! - [`events`] - Typed notification events and notifiers
//! - [`database`] - Postgres repositories
//! - [`orchestration`] - Component wiring and lifecycle
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Error types and taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inventory_orchestration::config::ConfigManager;
//! use inventory_orchestration::orchestration::{Collaborators, OrchestrationCore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config().clone();
//! let core = OrchestrationCore::bootstrap(config.clone(), Collaborators::in_memory(&config)?)?;
//! core.start();
//! // ...
//! core.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod analytics;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod locking;
pub mod logging;
pub mod orchestration;
pub mod reclaimer;
pub mod resilience;
pub mod scheduler;
pub mod state_machine;
pub mod time;

pub use analytics::{AnalyticsOperation, AnalyticsRouter, RouteSource, RoutedResult};
pub use config::{ConfigManager, OrchestrationConfig};
pub use error::{ErrorCategory, OrchestrationError, Result};
pub use events::{EventPublisher, NotificationEvent, Notifier};
pub use locking::{LockKey, LockRegistry};
pub use orchestration::{Collaborators, OrchestrationCore};
pub use reclaimer::{ReclaimReport, StaleResourceReclaimer};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use scheduler::{JobScheduler, JobStatus};
pub use state_machine::{
    ArtworkStateMachine, ArtworkStatus, OrderRequestStateMachine, OrderRequestStatus, WorkItem,
};
pub use time::{ManualTimeProvider, SystemTimeProvider, TimeProvider};
