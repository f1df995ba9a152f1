//! SLA deadline arithmetic.
//!
//! Breach detection compares exact timestamps (`now > deadline`); the
//! one-decimal hour figures exist for display only.

use super::states::{WorkItemKind, WorkflowStatus};
use super::work_item::WorkItem;
use crate::config::SlaConfig;
use crate::time::duration_from_hours;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// SLA windows applied to one workflow variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlaPolicy {
    pub window_hours: f64,
    pub warning_window_hours: f64,
}

impl SlaPolicy {
    pub fn for_kind(kind: WorkItemKind, config: &SlaConfig) -> Self {
        let window_hours = match kind {
            WorkItemKind::OrderRequest => config.order_request_hours,
            WorkItemKind::ArtworkReview => config.artwork_hours,
        };
        Self {
            window_hours,
            warning_window_hours: config.warning_window_hours,
        }
    }

    pub fn window(&self) -> Duration {
        duration_from_hours(self.window_hours)
    }

    pub fn warning_window(&self) -> Duration {
        duration_from_hours(self.warning_window_hours)
    }

    pub fn deadline_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_add_signed(self.window())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Display classification of an item's SLA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaState {
    /// No deadline has been set
    None,
    OnTrack,
    AtRisk,
    Breached,
}

/// Read-only SLA view for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaStatus {
    pub deadline: Option<DateTime<Utc>>,
    /// Rounded to one decimal; negative once overdue
    pub hours_remaining: Option<f64>,
    pub breached: bool,
    pub warned: bool,
    pub state: SlaState,
}

impl SlaStatus {
    pub fn of<S: WorkflowStatus>(item: &WorkItem<S>, policy: &SlaPolicy, now: DateTime<Utc>) -> Self {
        let Some(deadline) = item.sla_deadline else {
            return Self {
                deadline: None,
                hours_remaining: None,
                breached: item.sla_breached,
                warned: item.sla_warned,
                state: SlaState::None,
            };
        };

        let overdue = is_overdue(deadline, now);
        let state = if item.sla_breached || (overdue && item.status.is_sla_tracked()) {
            SlaState::Breached
        } else if item.status.is_sla_tracked() && deadline - now <= policy.warning_window() {
            SlaState::AtRisk
        } else {
            SlaState::OnTrack
        };

        Self {
            deadline: Some(deadline),
            hours_remaining: Some(round_to_tenth(hours_between(now, deadline))),
            breached: item.sla_breached,
            warned: item.sla_warned,
            state,
        }
    }
}

/// Exact breach test
pub fn is_overdue(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > deadline
}

/// Signed fractional hours from `from` to `to`
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
