//! # Orchestration Configuration System
//!
//! YAML-based configuration with environment overrides. Every section carries
//! defaults, so an empty configuration directory yields a working setup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use inventory_orchestration::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let tick = manager.config().scheduler.tick_interval();
//! let sla_hours = manager.config().sla.order_request_hours;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants;
use crate::constants::limits::{MAX_DURATION_SECONDS, MAX_SLA_HOURS};
use crate::resilience::CircuitBreakerConfig;
use crate::time::duration_from_secs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/base.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Job scheduler driver settings
    pub scheduler: SchedulerConfig,

    /// SLA windows for the workflow variants
    pub sla: SlaConfig,

    /// Circuit breaker guarding the external analytics service
    pub circuit_breaker: CircuitBreakerConfig,

    /// External analytics service and routing
    pub analytics: AnalyticsConfig,

    /// Stale-resource reclaimer
    pub reclaimer: ReclaimerConfig,

    /// Notification emitter
    pub notifications: NotificationConfig,

    /// Database connection (optional; in-memory storage when absent)
    pub database: DatabaseConfig,

    /// Logging output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: constants::scheduler::DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SlaConfig {
    /// Hours from `submitted` until an order request is overdue
    pub order_request_hours: f64,
    /// Hours from `submitted` until an artwork review is overdue
    pub artwork_hours: f64,
    /// Items whose deadline is closer than this are flagged as at risk
    pub warning_window_hours: f64,
    /// Cadence of the breach/warning sweep job
    pub sweep_interval_ms: u64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            order_request_hours: constants::sla::DEFAULT_ORDER_REQUEST_HOURS,
            artwork_hours: constants::sla::DEFAULT_ARTWORK_HOURS,
            warning_window_hours: constants::sla::DEFAULT_WARNING_WINDOW_HOURS,
            sweep_interval_ms: constants::scheduler::DEFAULT_SLA_SWEEP_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub health_cache_ttl_seconds: u64,
    pub recalculation_interval_ms: u64,
    pub default_horizon_days: u32,
}

impl AnalyticsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn health_cache_ttl(&self) -> chrono::Duration {
        duration_from_secs(self.health_cache_ttl_seconds)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: constants::analytics::DEFAULT_BASE_URL.to_string(),
            request_timeout_seconds: constants::analytics::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            health_cache_ttl_seconds: constants::analytics::DEFAULT_HEALTH_CACHE_TTL_SECONDS,
            recalculation_interval_ms: constants::scheduler::DEFAULT_ANALYTICS_RECALC_INTERVAL_MS,
            default_horizon_days: constants::analytics::DEFAULT_FORECAST_HORIZON_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReclaimerConfig {
    pub enabled: bool,
    pub stale_timeout_seconds: u64,
    pub interval_ms: u64,
    pub batch_size: u32,
}

impl ReclaimerConfig {
    pub fn stale_timeout(&self) -> chrono::Duration {
        duration_from_secs(self.stale_timeout_seconds)
    }
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_timeout_seconds: constants::reclaimer::DEFAULT_STALE_TIMEOUT_SECONDS,
            interval_ms: constants::reclaimer::DEFAULT_RECLAIM_INTERVAL_MS,
            batch_size: constants::reclaimer::DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: constants::notifications::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string; `None` selects the in-memory store
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; environment default when absent
    pub level: Option<String>,
    pub json: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            json: false,
            ansi: true,
        }
    }
}

impl OrchestrationConfig {
    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler.tick_interval_ms",
                0,
                "tick interval must be greater than 0",
            ));
        }

        for (field, hours) in [
            ("sla.order_request_hours", self.sla.order_request_hours),
            ("sla.artwork_hours", self.sla.artwork_hours),
        ] {
            if !hours.is_finite() || hours <= 0.0 || hours > MAX_SLA_HOURS {
                return Err(ConfigurationError::invalid_value(
                    field,
                    hours,
                    format!("SLA window must be between 0 and {MAX_SLA_HOURS} hours"),
                ));
            }
            if self.sla.warning_window_hours >= hours {
                return Err(ConfigurationError::invalid_value(
                    "sla.warning_window_hours",
                    self.sla.warning_window_hours,
                    format!("warning window must be shorter than {field}"),
                ));
            }
        }

        if !self.sla.warning_window_hours.is_finite() || self.sla.warning_window_hours < 0.0 {
            return Err(ConfigurationError::invalid_value(
                "sla.warning_window_hours",
                self.sla.warning_window_hours,
                "warning window must be a non-negative number of hours",
            ));
        }

        for (field, seconds) in [
            ("analytics.request_timeout_seconds", self.analytics.request_timeout_seconds),
            ("analytics.health_cache_ttl_seconds", self.analytics.health_cache_ttl_seconds),
            ("reclaimer.stale_timeout_seconds", self.reclaimer.stale_timeout_seconds),
            ("scheduler.tick_interval_ms", self.scheduler.tick_interval_ms / 1000),
            ("sla.sweep_interval_ms", self.sla.sweep_interval_ms / 1000),
            ("analytics.recalculation_interval_ms", self.analytics.recalculation_interval_ms / 1000),
            ("reclaimer.interval_ms", self.reclaimer.interval_ms / 1000),
        ] {
            if seconds > MAX_DURATION_SECONDS {
                return Err(ConfigurationError::invalid_value(
                    field,
                    seconds,
                    format!("duration must not exceed {MAX_DURATION_SECONDS} seconds"),
                ));
            }
        }

        if self.sla.sweep_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "sla.sweep_interval_ms",
                0,
                "sweep interval must be greater than 0",
            ));
        }

        self.circuit_breaker
            .validate()
            .map_err(|reason| ConfigurationError::invalid_value("circuit_breaker", "-", reason))?;

        if self.analytics.base_url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "analytics.base_url",
                "analytics configuration",
            ));
        }

        if self.analytics.request_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "analytics.request_timeout_seconds",
                0,
                "request timeout must be greater than 0",
            ));
        }

        if self.analytics.recalculation_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "analytics.recalculation_interval_ms",
                0,
                "recalculation interval must be greater than 0",
            ));
        }

        if self.reclaimer.stale_timeout_seconds == 0 || self.reclaimer.interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "reclaimer",
                "0",
                "stale timeout and interval must be greater than 0",
            ));
        }

        if self.reclaimer.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "reclaimer.batch_size",
                0,
                "batch size must be greater than 0",
            ));
        }

        if self.notifications.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "notifications.channel_capacity",
                0,
                "channel capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.tick_interval(), Duration::from_secs(10));
        assert_eq!(config.circuit_breaker.max_failures, 3);
        assert_eq!(config.reclaimer.stale_timeout(), chrono::Duration::minutes(10));
    }

    #[test]
    fn test_warning_window_must_be_shorter_than_sla() {
        let mut config = OrchestrationConfig::default();
        config.sla.warning_window_hours = 30.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sla.warning_window_hours"));
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let mut config = OrchestrationConfig::default();
        config.reclaimer.stale_timeout_seconds = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reclaimer.stale_timeout_seconds"));
        // The accessor never wraps into the future
        assert!(config.reclaimer.stale_timeout() > chrono::Duration::zero());

        let mut config = OrchestrationConfig::default();
        config.sla.order_request_hours = 1e300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sla.order_request_hours"));

        let mut config = OrchestrationConfig::default();
        config.sla.artwork_hours = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = OrchestrationConfig::default();
        config.circuit_breaker.alert_cooldown_seconds = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut config = OrchestrationConfig::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: OrchestrationConfig = serde_json::from_value(serde_json::json!({
            "sla": { "order_request_hours": 12.0 }
        }))
        .unwrap();
        assert_eq!(config.sla.order_request_hours, 12.0);
        assert_eq!(config.sla.artwork_hours, 48.0);
        assert_eq!(config.scheduler.tick_interval_ms, 10_000);
    }
}
