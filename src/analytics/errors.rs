use crate::error::ErrorCategory;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Primary service unreachable, timed out or answered non-2xx
    #[error("Analytics service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Invalid {operation} response from analytics service: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Invalid analytics request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Usage history unavailable: {reason}")]
    DataSource { reason: String },

    #[error("Analytics client configuration error: {reason}")]
    Configuration { reason: String },
}

impl AnalyticsError {
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ServiceUnavailable { .. } | Self::InvalidResponse { .. } => {
                ErrorCategory::ServiceUnavailable
            }
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::DataSource { .. } | Self::Configuration { .. } => ErrorCategory::Infrastructure,
        }
    }
}

impl From<reqwest::Error> for AnalyticsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::service_unavailable(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::InvalidResponse {
                operation: "decode".to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::service_unavailable(err.to_string())
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
