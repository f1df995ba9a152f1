use super::states::WorkItemKind;
use crate::error::ErrorCategory;
use thiserror::Error;
use uuid::Uuid;

/// Outcome of a rejected or failed workflow operation.
///
/// Validation variants are ordinary results for callers to show to users;
/// only `Persistence` signals an infrastructure fault.
#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Invalid {kind} transition from {from} to {to} (allowed: {allowed:?})")]
    InvalidTransition {
        kind: WorkItemKind,
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    #[error("A reason is required to enter status {status}")]
    MissingReason { status: String },

    #[error("Work item {id} not found")]
    NotFound { id: Uuid },

    #[error("Persistence operation failed: {0}")]
    Persistence(#[source] PersistenceError),
}

impl StateMachineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidTransition { .. } | Self::MissingReason { .. } => {
                ErrorCategory::Validation
            }
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Persistence(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Allowed targets carried by an `InvalidTransition`
    pub fn allowed(&self) -> Option<&[String]> {
        match self {
            Self::InvalidTransition { allowed, .. } => Some(allowed),
            _ => None,
        }
    }
}

/// Storage-level failures
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Record {id} not found")]
    NotFound { id: Uuid },

    #[error("Stored value '{value}' is not a valid {field}")]
    InvalidStoredValue { field: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<PersistenceError> for StateMachineError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { id } => Self::NotFound { id },
            other => Self::Persistence(other),
        }
    }
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_through() {
        let err: StateMachineError = PersistenceError::NotFound { id: Uuid::nil() }.into();
        assert!(matches!(err, StateMachineError::NotFound { .. }));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = StateMachineError::InvalidTransition {
            kind: WorkItemKind::OrderRequest,
            from: "draft".to_string(),
            to: "fulfilled".to_string(),
            allowed: vec!["submitted".to_string(), "cancelled".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid order_request transition from draft to fulfilled (allowed: [\"submitted\", \"cancelled\"])"
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
