use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// The two client-facing work item variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    OrderRequest,
    ArtworkReview,
}

impl WorkItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderRequest => "order_request",
            Self::ArtworkReview => "artwork_review",
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What entering a status does to the item's SLA clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaEffect {
    /// Start a fresh deadline and clear breach/warn flags
    Start,
    /// Stop the clock and record whether the deadline was missed
    Resolve,
    /// Leave the SLA fields untouched
    Keep,
}

/// A workflow variant's status set and its per-status policy.
///
/// The transition table itself is the `allowed_transitions` enumeration; the
/// engine never consults anything else to decide reachability.
pub trait WorkflowStatus:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = String>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: WorkItemKind;

    /// Every status of the variant, in declaration order
    fn all() -> &'static [Self];

    /// Status assigned on creation
    fn initial() -> Self;

    /// Statuses directly reachable from `self`
    fn allowed_transitions(self) -> &'static [Self];

    fn sla_effect(self) -> SlaEffect;

    /// Whether the SLA clock is running while the item sits in this status
    fn is_sla_tracked(self) -> bool;

    /// Whether entering this status requires an explanatory reason
    fn requires_reason(self) -> bool;

    fn as_str(self) -> &'static str;

    fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Statuses in which the SLA clock runs
    fn sla_tracked_statuses() -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|s| s.is_sla_tracked())
            .collect()
    }
}

/// Client order request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRequestStatus {
    Draft,
    Submitted,
    Acknowledged,
    ChangesRequested,
    OnHold,
    Fulfilled,
    Cancelled,
}

impl WorkflowStatus for OrderRequestStatus {
    const KIND: WorkItemKind = WorkItemKind::OrderRequest;

    fn all() -> &'static [Self] {
        use OrderRequestStatus::*;
        &[
            Draft,
            Submitted,
            Acknowledged,
            ChangesRequested,
            OnHold,
            Fulfilled,
            Cancelled,
        ]
    }

    fn initial() -> Self {
        Self::Draft
    }

    fn allowed_transitions(self) -> &'static [Self] {
        use OrderRequestStatus::*;
        match self {
            Draft => &[Submitted, Cancelled],
            Submitted => &[Acknowledged, ChangesRequested, OnHold, Cancelled],
            Acknowledged => &[Fulfilled, OnHold, Cancelled],
            ChangesRequested => &[Submitted, Cancelled],
            OnHold => &[Acknowledged, ChangesRequested, Cancelled],
            Fulfilled | Cancelled => &[],
        }
    }

    fn sla_effect(self) -> SlaEffect {
        match self {
            Self::Submitted => SlaEffect::Start,
            Self::Acknowledged => SlaEffect::Resolve,
            _ => SlaEffect::Keep,
        }
    }

    fn is_sla_tracked(self) -> bool {
        matches!(self, Self::Submitted)
    }

    fn requires_reason(self) -> bool {
        matches!(self, Self::ChangesRequested | Self::OnHold)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Acknowledged => "acknowledged",
            Self::ChangesRequested => "changes_requested",
            Self::OnHold => "on_hold",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid order request status: {s}"))
    }
}

impl Default for OrderRequestStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// Artwork approval lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    ChangesRequested,
    Cancelled,
}

impl WorkflowStatus for ArtworkStatus {
    const KIND: WorkItemKind = WorkItemKind::ArtworkReview;

    fn all() -> &'static [Self] {
        use ArtworkStatus::*;
        &[
            Draft,
            Submitted,
            UnderReview,
            Approved,
            Rejected,
            ChangesRequested,
            Cancelled,
        ]
    }

    fn initial() -> Self {
        Self::Draft
    }

    fn allowed_transitions(self) -> &'static [Self] {
        use ArtworkStatus::*;
        match self {
            Draft => &[Submitted, Cancelled],
            Submitted => &[UnderReview, ChangesRequested, Cancelled],
            UnderReview => &[Approved, Rejected, ChangesRequested, Cancelled],
            ChangesRequested => &[Submitted, Cancelled],
            Approved | Rejected | Cancelled => &[],
        }
    }

    fn sla_effect(self) -> SlaEffect {
        match self {
            Self::Submitted => SlaEffect::Start,
            Self::Approved | Self::Rejected | Self::ChangesRequested => SlaEffect::Resolve,
            _ => SlaEffect::Keep,
        }
    }

    fn is_sla_tracked(self) -> bool {
        matches!(self, Self::Submitted | Self::UnderReview)
    }

    fn requires_reason(self) -> bool {
        matches!(self, Self::ChangesRequested | Self::Rejected)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ChangesRequested => "changes_requested",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ArtworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtworkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid artwork status: {s}"))
    }
}

impl Default for ArtworkStatus {
    fn default() -> Self {
        Self::Draft
    }
}
