//! Crate-level error type and the error taxonomy shared by every component.

use crate::analytics::AnalyticsError;
use crate::config::ConfigurationError;
use crate::reclaimer::ReclaimError;
use crate::scheduler::SchedulerError;
use crate::state_machine::{PersistenceError, StateMachineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("Reclaim error: {0}")]
    Reclaim(#[from] ReclaimError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How an error should be treated by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// User-correctable input problem, returned as a structured result
    Validation,
    /// The referenced entity does not exist
    NotFound,
    /// Self-resolving contention; the next cycle retries
    Transient,
    /// External dependency failed; counts against the circuit breaker
    ServiceUnavailable,
    /// Storage or wiring fault
    Infrastructure,
    /// System-generated notice, not a failure
    Informational,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Transient => "transient",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Infrastructure => "infrastructure",
            Self::Informational => "informational",
        };
        f.write_str(label)
    }
}

impl OrchestrationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StateMachine(err) => err.category(),
            Self::Persistence(PersistenceError::NotFound { .. }) => ErrorCategory::NotFound,
            Self::Persistence(_) => ErrorCategory::Infrastructure,
            Self::Analytics(err) => err.category(),
            Self::Scheduler(err) => err.category(),
            Self::Reclaim(_) => ErrorCategory::Infrastructure,
            Self::Configuration(_) => ErrorCategory::Infrastructure,
            Self::Internal(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Whether the error should be shown to an end user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::NotFound
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_category_mapping() {
        let err: OrchestrationError = StateMachineError::MissingReason {
            status: "on_hold".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.is_user_facing());

        let err: OrchestrationError = PersistenceError::NotFound { id: Uuid::nil() }.into();
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err: OrchestrationError = SchedulerError::LockBusy {
            name: "sla_sweep".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(!err.is_user_facing());

        let err: OrchestrationError = AnalyticsError::ServiceUnavailable {
            reason: "timeout".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::ServiceUnavailable);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::ServiceUnavailable.to_string(), "service_unavailable");
    }
}
