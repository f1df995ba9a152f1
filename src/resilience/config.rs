//! # Circuit Breaker Configuration

use crate::constants::circuit_breaker::{
    DEFAULT_ALERT_COOLDOWN_SECONDS, DEFAULT_MAX_FAILURES, DEFAULT_RESET_TIMEOUT_SECONDS,
};
use crate::constants::limits::MAX_DURATION_SECONDS;
use crate::time::duration_from_secs;
use serde::{Deserialize, Serialize};

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub max_failures: u32,

    /// Seconds to stay open before admitting a probe
    pub reset_timeout_seconds: u64,

    /// Minimum seconds between two "circuit opened" admin alerts
    pub alert_cooldown_seconds: u64,
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> chrono::Duration {
        duration_from_secs(self.reset_timeout_seconds)
    }

    pub fn alert_cooldown(&self) -> chrono::Duration {
        duration_from_secs(self.alert_cooldown_seconds)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_failures == 0 {
            return Err("max_failures must be greater than 0".to_string());
        }

        if self.max_failures > 100 {
            return Err("max_failures should not exceed 100".to_string());
        }

        if self.reset_timeout_seconds == 0 {
            return Err("reset_timeout_seconds must be greater than 0".to_string());
        }

        if self.reset_timeout_seconds > 3600 {
            return Err("reset_timeout_seconds should not exceed 3600".to_string());
        }

        if self.alert_cooldown_seconds > MAX_DURATION_SECONDS {
            return Err(format!(
                "alert_cooldown_seconds should not exceed {MAX_DURATION_SECONDS}"
            ));
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            reset_timeout_seconds: DEFAULT_RESET_TIMEOUT_SECONDS,
            alert_cooldown_seconds: DEFAULT_ALERT_COOLDOWN_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CircuitBreakerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reset_timeout(), chrono::Duration::seconds(60));
        assert_eq!(config.alert_cooldown(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_invalid_thresholds() {
        let zero = CircuitBreakerConfig {
            max_failures: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let no_cooldown = CircuitBreakerConfig {
            reset_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(no_cooldown.validate().is_err());

        let endless_cooldown = CircuitBreakerConfig {
            alert_cooldown_seconds: u64::MAX,
            ..Default::default()
        };
        assert!(endless_cooldown.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: CircuitBreakerConfig = serde_json::from_str(r#"{"max_failures": 5}"#).unwrap();
        assert_eq!(config.max_failures, 5);
        assert_eq!(config.reset_timeout_seconds, 60);
    }
}
