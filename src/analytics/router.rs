use super::client::AnalyticsService;
use super::errors::AnalyticsResult;
use super::fallback::LocalAnalytics;
use super::types::{AnalyticsOperation, RouteSource, RoutedResult};
use crate::config::AnalyticsConfig;
use crate::constants::analytics::PRIMARY_SERVICE_FLAG;
use crate::resilience::{CircuitBreaker, CircuitBreakerStatus};
use crate::time::SharedTimeProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-tenant feature flag lookup
#[async_trait]
pub trait FeatureFlags: Send + Sync + fmt::Debug {
    async fn is_enabled(&self, tenant_id: &str, flag: &str) -> bool;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryFeatureFlags {
    enabled: Arc<DashSet<(String, String)>>,
}

impl InMemoryFeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self, tenant_id: &str, flag: &str) {
        self.enabled.insert((tenant_id.to_string(), flag.to_string()));
    }

    pub fn disable(&self, tenant_id: &str, flag: &str) {
        self.enabled.remove(&(tenant_id.to_string(), flag.to_string()));
    }
}

#[async_trait]
impl FeatureFlags for InMemoryFeatureFlags {
    async fn is_enabled(&self, tenant_id: &str, flag: &str) -> bool {
        self.enabled
            .contains(&(tenant_id.to_string(), flag.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
struct HealthSnapshot {
    healthy: bool,
    checked_at: DateTime<Utc>,
}

/// Chooses between the external analytics service and the local fallback.
///
/// Primary-side failures never escape `route`; they are recorded on the
/// breaker and answered from the fallback. Only fallback failures propagate.
#[derive(Debug)]
pub struct AnalyticsRouter {
    primary: Arc<dyn AnalyticsService>,
    fallback: LocalAnalytics,
    flags: Arc<dyn FeatureFlags>,
    breaker: Arc<CircuitBreaker>,
    time: SharedTimeProvider,
    health_ttl: Duration,
    health: Mutex<Option<HealthSnapshot>>,
}

impl AnalyticsRouter {
    pub fn new(
        primary: Arc<dyn AnalyticsService>,
        fallback: LocalAnalytics,
        flags: Arc<dyn FeatureFlags>,
        breaker: Arc<CircuitBreaker>,
        time: SharedTimeProvider,
        config: &AnalyticsConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            flags,
            breaker,
            time,
            health_ttl: config.health_cache_ttl(),
            health: Mutex::new(None),
        }
    }

    pub async fn route(
        &self,
        tenant_id: &str,
        operation: &AnalyticsOperation,
    ) -> AnalyticsResult<RoutedResult> {
        if !self.flags.is_enabled(tenant_id, PRIMARY_SERVICE_FLAG).await {
            let outcome = self.fallback.execute(tenant_id, operation).await?;
            debug!(tenant_id, operation = operation.name(), "Routed to local analytics");
            return Ok(RoutedResult {
                source: RouteSource::FallbackOnly,
                outcome,
                degraded_reason: None,
            });
        }

        // Health is checked before the breaker so a half-open probe slot is
        // only taken when the call is actually made
        let degraded_reason = if !self.primary_healthy().await {
            "analytics service health check failed".to_string()
        } else if !self.breaker.should_allow() {
            format!("circuit breaker {} is open", self.breaker.name())
        } else {
            match self.primary.execute(operation).await {
                Ok(outcome) => {
                    self.breaker.record_success();
                    debug!(tenant_id, operation = operation.name(), "Routed to analytics service");
                    return Ok(RoutedResult {
                        source: RouteSource::Primary,
                        outcome,
                        degraded_reason: None,
                    });
                }
                Err(err) => {
                    self.breaker.record_failure(&err);
                    err.to_string()
                }
            }
        };

        info!(
            tenant_id,
            operation = operation.name(),
            reason = %degraded_reason,
            "Analytics degraded to local fallback"
        );
        let outcome = self.fallback.execute(tenant_id, operation).await?;
        Ok(RoutedResult {
            source: RouteSource::DegradedFallback,
            outcome,
            degraded_reason: Some(degraded_reason),
        })
    }

    /// Cached health probe, refreshed at most once per TTL
    pub async fn primary_healthy(&self) -> bool {
        let now = self.time.utc_now();
        if let Some(snapshot) = *self.health.lock() {
            if now - snapshot.checked_at < self.health_ttl {
                return snapshot.healthy;
            }
        }

        let healthy = match self.primary.health().await {
            Ok(response) => response.is_healthy(),
            Err(err) => {
                warn!(error = %err, "Analytics health probe failed");
                false
            }
        };
        *self.health.lock() = Some(HealthSnapshot {
            healthy,
            checked_at: now,
        });
        healthy
    }

    pub fn invalidate_health_cache(&self) {
        *self.health.lock() = None;
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        self.breaker.status()
    }
}
