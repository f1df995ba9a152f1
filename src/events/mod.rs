//! # Notification Events
//!
//! Closed set of audit/notification events emitted by the orchestration core.
//! Each variant carries its own statically-known payload; consumers match on
//! the enum instead of probing untyped metadata.

pub mod publisher;

use crate::state_machine::WorkItemKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use publisher::{EventPublisher, Notifier, PublishedEvent, RecordingNotifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A work item moved between workflow statuses
    StatusChanged {
        kind: WorkItemKind,
        item_id: Uuid,
        tenant_id: String,
        from: String,
        to: String,
        actor: String,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    /// A tracked work item passed its SLA deadline
    SlaBreached {
        kind: WorkItemKind,
        item_id: Uuid,
        tenant_id: String,
        status: String,
        deadline: DateTime<Utc>,
        detected_at: DateTime<Utc>,
    },
    /// A tracked work item entered the warning window before its deadline
    SlaWarning {
        kind: WorkItemKind,
        item_id: Uuid,
        tenant_id: String,
        status: String,
        deadline: DateTime<Utc>,
        hours_remaining: f64,
    },
    /// The reclaimer failed a resource stuck in a processing state
    StaleResourceRecovered {
        resource_kind: String,
        resource_id: String,
        tenant_id: String,
        stale_since: DateTime<Utc>,
        message: String,
    },
    /// Admin alert: a circuit breaker tripped from closed to open
    CircuitOpened {
        breaker: String,
        failure_count: u32,
        last_error: String,
        opened_at: DateTime<Utc>,
    },
    /// A circuit breaker recovered after a successful probe
    CircuitClosed {
        breaker: String,
        closed_at: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Stable name used for routing and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "status_changed",
            Self::SlaBreached { .. } => "sla_breached",
            Self::SlaWarning { .. } => "sla_warning",
            Self::StaleResourceRecovered { .. } => "stale_resource_recovered",
            Self::CircuitOpened { .. } => "circuit_opened",
            Self::CircuitClosed { .. } => "circuit_closed",
        }
    }

    /// Whether the event should reach operators rather than tenants
    pub fn is_admin_alert(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpened { .. } | Self::StaleResourceRecovered { .. }
        )
    }
}
