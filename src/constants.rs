//! System-wide defaults for the orchestration core.
//!
//! Configuration files override every value here; these are the fallbacks
//! used when a key is absent.

/// Scheduler defaults
pub mod scheduler {
    /// Driver tick cadence
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10_000;
    /// Cadence of the SLA breach/warning sweep
    pub const DEFAULT_SLA_SWEEP_INTERVAL_MS: u64 = 5 * 60 * 1000;
    /// Cadence of the analytics recalculation job
    pub const DEFAULT_ANALYTICS_RECALC_INTERVAL_MS: u64 = 6 * 60 * 60 * 1000;
}

/// Built-in job names
pub mod jobs {
    pub const SLA_SWEEP: &str = "sla_sweep";
    pub const ANALYTICS_RECALCULATION: &str = "analytics_recalculation";
    pub const STALE_RESOURCE_RECLAIM: &str = "stale_resource_reclaim";
}

/// SLA defaults
pub mod sla {
    pub const DEFAULT_ORDER_REQUEST_HOURS: f64 = 24.0;
    pub const DEFAULT_ARTWORK_HOURS: f64 = 48.0;
    pub const DEFAULT_WARNING_WINDOW_HOURS: f64 = 4.0;
}

/// Circuit breaker defaults
pub mod circuit_breaker {
    pub const DEFAULT_MAX_FAILURES: u32 = 3;
    pub const DEFAULT_RESET_TIMEOUT_SECONDS: u64 = 60;
    pub const DEFAULT_ALERT_COOLDOWN_SECONDS: u64 = 30 * 60;
    /// Name of the breaker guarding the external analytics service
    pub const ANALYTICS_BREAKER_NAME: &str = "ml_analytics";
}

/// Analytics routing defaults
pub mod analytics {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
    pub const DEFAULT_HEALTH_CACHE_TTL_SECONDS: u64 = 30;
    pub const DEFAULT_FORECAST_HORIZON_DAYS: u32 = 30;
    /// Tenant feature flag that opts a tenant into the external service
    pub const PRIMARY_SERVICE_FLAG: &str = "ml_analytics";
    /// Weight applied to the most recent periods of a usage history
    pub const RECENT_PERIOD_WEIGHT: f64 = 1.5;
    /// Number of trailing periods that receive the recent weight
    pub const RECENT_PERIODS: usize = 3;
    /// Two-sided 95% z-score for confidence bounds
    pub const CONFIDENCE_Z: f64 = 1.96;
}

/// Stale-resource reclaimer defaults
pub mod reclaimer {
    pub const DEFAULT_STALE_TIMEOUT_SECONDS: u64 = 10 * 60;
    pub const DEFAULT_RECLAIM_INTERVAL_MS: u64 = 5 * 60 * 1000;
    pub const DEFAULT_BATCH_SIZE: u32 = 100;
}

/// Upper bounds accepted for configured durations; larger values are rejected
/// by validation and clamped by the duration helpers in [`crate::time`]
pub mod limits {
    /// Ten years
    pub const MAX_DURATION_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;
    pub const MAX_SLA_HOURS: f64 = (MAX_DURATION_SECONDS / 3600) as f64;
}

/// Notification defaults
pub mod notifications {
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
}

/// Actor recorded on system-generated transitions and failures
pub const SYSTEM_ACTOR: &str = "system";
