//! # Circuit Breaker Implementation
//!
//! Three-state guard around the external analytics service: Closed (calls pass
//! through), Open (calls blocked, callers fall back) and HalfOpen (exactly one
//! probe call admitted).
//!
//! The Open → HalfOpen edge is evaluated lazily inside [`CircuitBreaker::should_allow`]
//! rather than by a timer, so the state is always a function of the failure
//! history and the current time. The HalfOpen probe slot expires the same way:
//! a probe that never reports back (cancelled or panicked caller) stops
//! blocking callers once `reset_timeout` has passed since it was admitted.

use crate::events::{NotificationEvent, Notifier};
use crate::resilience::CircuitBreakerConfig;
use crate::time::SharedTimeProvider;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    #[default]
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - a single probe call is allowed
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Point-in-time view for admin dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub max_failures: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_alert_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Earliest time an open circuit will admit a probe
    pub retry_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<DateTime<Utc>>,
    last_alert_time: Option<DateTime<Utc>>,
    last_error: Option<String>,
    /// When the current HalfOpen probe was admitted
    probe_started_at: Option<DateTime<Utc>>,
}

/// Process-local circuit breaker.
///
/// State lives in memory only; a restart begins Closed with no failure history.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and alerts
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    time: SharedTimeProvider,
    notifier: Option<Arc<dyn Notifier>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig, time: SharedTimeProvider) -> Self {
        let name = name.into();
        info!(
            component = %name,
            max_failures = config.max_failures,
            reset_timeout_seconds = config.reset_timeout_seconds,
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            state: Mutex::new(BreakerState::default()),
            time,
            notifier: None,
        }
    }

    /// Send open/close notifications to `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state without evaluating the cooldown
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    /// Decide whether a guarded call may proceed.
    ///
    /// An open circuit whose cooldown has elapsed moves to HalfOpen here and
    /// admits the caller as its single probe; every other caller sees `false`
    /// until that probe records its outcome or `reset_timeout` passes without
    /// one, after which the next caller takes over the probe slot.
    pub fn should_allow(&self) -> bool {
        let now = self.time.utc_now();
        let mut inner = self.state.lock();

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure_time
                    .map_or(true, |failed_at| now - failed_at >= self.config.reset_timeout());
                if !cooled_down {
                    return false;
                }
                inner.state = CircuitState::HalfOpen;
                inner.probe_started_at = Some(now);
                info!(component = %self.name, "Circuit breaker half-open (admitting probe)");
                true
            }
            CircuitState::HalfOpen => {
                let probe_pending = inner
                    .probe_started_at
                    .is_some_and(|started| now - started < self.config.reset_timeout());
                if probe_pending {
                    return false;
                }
                if inner.probe_started_at.is_some() {
                    warn!(
                        component = %self.name,
                        "Recovery probe never reported an outcome; admitting a new probe"
                    );
                }
                inner.probe_started_at = Some(now);
                true
            }
        }
    }

    /// Record a successful guarded call
    pub fn record_success(&self) {
        let now = self.time.utc_now();
        let event = {
            let mut inner = self.state.lock();
            match inner.state {
                CircuitState::HalfOpen => {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.probe_started_at = None;
                    inner.last_error = None;
                    info!(component = %self.name, "Circuit breaker closed (recovered)");
                    Some(NotificationEvent::CircuitClosed {
                        breaker: self.name.clone(),
                        closed_at: now,
                    })
                }
                CircuitState::Closed => {
                    inner.failure_count = 0;
                    None
                }
                CircuitState::Open => {
                    debug!(component = %self.name, "Success recorded while circuit is open");
                    None
                }
            }
        };

        if let Some(event) = event {
            self.notify(event);
        }
    }

    /// Record a failed guarded call
    pub fn record_failure(&self, err: &dyn fmt::Display) {
        let now = self.time.utc_now();
        let message = err.to_string();
        let alert = {
            let mut inner = self.state.lock();
            inner.failure_count = inner.failure_count.saturating_add(1);
            inner.last_failure_time = Some(now);
            inner.last_error = Some(message.clone());

            match inner.state {
                CircuitState::Closed if inner.failure_count >= self.config.max_failures => {
                    inner.state = CircuitState::Open;
                    error!(
                        component = %self.name,
                        failure_count = inner.failure_count,
                        max_failures = self.config.max_failures,
                        error = %message,
                        "Circuit breaker opened (failing fast)"
                    );
                    self.take_alert(&mut inner, now)
                }
                CircuitState::Closed => {
                    warn!(
                        component = %self.name,
                        failure_count = inner.failure_count,
                        error = %message,
                        "Guarded call failed"
                    );
                    None
                }
                CircuitState::HalfOpen => {
                    inner.state = CircuitState::Open;
                    inner.probe_started_at = None;
                    warn!(
                        component = %self.name,
                        error = %message,
                        "Recovery probe failed, circuit re-opened"
                    );
                    None
                }
                CircuitState::Open => None,
            }
        };

        if let Some(event) = alert {
            self.notify(event);
        }
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if !self.should_allow() {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    /// Operator action: open the circuit now and restart the cooldown
    pub fn force_open(&self) {
        let now = self.time.utc_now();
        let mut inner = self.state.lock();
        inner.state = CircuitState::Open;
        inner.last_failure_time = Some(now);
        inner.probe_started_at = None;
        warn!(component = %self.name, "Circuit breaker forced open");
    }

    /// Operator action: close the circuit and clear the failure history
    pub fn reset(&self) {
        let mut inner = self.state.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_time = None;
        inner.last_error = None;
        inner.probe_started_at = None;
        warn!(component = %self.name, "Circuit breaker manually reset");
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let inner = self.state.lock();
        let retry_at = match inner.state {
            CircuitState::Open => inner
                .last_failure_time
                .map(|failed_at| failed_at + self.config.reset_timeout()),
            _ => None,
        };
        CircuitBreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            max_failures: self.config.max_failures,
            last_failure_time: inner.last_failure_time,
            last_alert_time: inner.last_alert_time,
            last_error: inner.last_error.clone(),
            retry_at,
        }
    }

    /// Build the opened alert unless one went out within the cooldown
    fn take_alert(&self, inner: &mut BreakerState, now: DateTime<Utc>) -> Option<NotificationEvent> {
        let cooling = inner
            .last_alert_time
            .is_some_and(|sent| now - sent < self.config.alert_cooldown());
        if cooling {
            debug!(component = %self.name, "Circuit opened alert suppressed by cooldown");
            return None;
        }
        inner.last_alert_time = Some(now);
        Some(NotificationEvent::CircuitOpened {
            breaker: self.name.clone(),
            failure_count: inner.failure_count,
            last_error: inner.last_error.clone().unwrap_or_default(),
            opened_at: now,
        })
    }

    fn notify(&self, event: NotificationEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingNotifier;
    use crate::time::{ManualTimeProvider, TimeProvider};
    use chrono::Duration;

    fn breaker() -> (CircuitBreaker, ManualTimeProvider, RecordingNotifier) {
        let clock = ManualTimeProvider::starting_now();
        let notifier = RecordingNotifier::new();
        let breaker = CircuitBreaker::new("test", CircuitBreakerConfig::default(), Arc::new(clock.clone()))
            .with_notifier(Arc::new(notifier.clone()));
        (breaker, clock, notifier)
    }

    fn fail(breaker: &CircuitBreaker) {
        breaker.record_failure(&"connection refused");
    }

    #[test]
    fn test_opens_after_max_failures() {
        let (breaker, _, notifier) = breaker();
        fail(&breaker);
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_allow());
        assert_eq!(notifier.count_of("circuit_opened"), 1);
    }

    #[test]
    fn test_success_resets_consecutive_count() {
        let (breaker, _, _) = breaker();
        fail(&breaker);
        fail(&breaker);
        breaker.record_success();
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
    }

    #[test]
    fn test_half_open_admits_single_probe() {
        let (breaker, clock, notifier) = breaker();
        for _ in 0..3 {
            fail(&breaker);
        }
        clock.advance(Duration::seconds(59));
        assert!(!breaker.should_allow());

        clock.advance(Duration::seconds(1));
        assert!(breaker.should_allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.should_allow());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
        assert_eq!(notifier.count_of("circuit_closed"), 1);
    }

    #[test]
    fn test_failed_probe_restarts_cooldown() {
        let (breaker, clock, notifier) = breaker();
        for _ in 0..3 {
            fail(&breaker);
        }
        clock.advance(Duration::seconds(61));
        assert!(breaker.should_allow());
        fail(&breaker);

        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 4);
        assert!(!breaker.should_allow());
        clock.advance(Duration::seconds(60));
        assert!(breaker.should_allow());
        // Re-opening from half-open is not a fresh outage
        assert_eq!(notifier.count_of("circuit_opened"), 1);
    }

    #[test]
    fn test_abandoned_recovery_slot_expires() {
        let (breaker, clock, notifier) = breaker();
        for _ in 0..3 {
            fail(&breaker);
        }
        clock.advance(Duration::seconds(61));
        // Admitted, but the caller never records an outcome
        assert!(breaker.should_allow());
        assert!(!breaker.should_allow());

        clock.advance(Duration::seconds(59));
        assert!(!breaker.should_allow());

        clock.advance(Duration::seconds(1));
        assert!(breaker.should_allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.should_allow());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(notifier.count_of("circuit_closed"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_recovery_call_does_not_wedge_breaker() {
        let (breaker, clock, _) = breaker();
        for _ in 0..3 {
            fail(&breaker);
        }
        clock.advance(Duration::seconds(61));

        let hung = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            breaker.call(|| async {
                std::future::pending::<()>().await;
                Ok::<_, String>(())
            }),
        )
        .await;
        assert!(hung.is_err());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        clock.advance(Duration::hours(24));
        let recovered = breaker.call(|| async { Ok::<_, String>("forecast") }).await;
        assert_eq!(recovered.unwrap(), "forecast");
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_alerts_rate_limited() {
        let (breaker, clock, notifier) = breaker();
        for _ in 0..3 {
            fail(&breaker);
        }
        breaker.reset();
        clock.advance(Duration::minutes(10));
        for _ in 0..3 {
            fail(&breaker);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(notifier.count_of("circuit_opened"), 1);

        breaker.reset();
        clock.advance(Duration::minutes(30));
        for _ in 0..3 {
            fail(&breaker);
        }
        assert_eq!(notifier.count_of("circuit_opened"), 2);
    }

    #[test]
    fn test_status_snapshot() {
        let (breaker, clock, _) = breaker();
        breaker.force_open();
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Open);
        assert_eq!(status.retry_at, Some(clock.utc_now() + Duration::seconds(60)));

        breaker.reset();
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.retry_at, None);
    }

    #[tokio::test]
    async fn test_call_wraps_operation() {
        let (breaker, _, _) = breaker();
        let ok = breaker.call(|| async { Ok::<_, String>("forecast") }).await;
        assert_eq!(ok.unwrap(), "forecast");

        for _ in 0..3 {
            let result = breaker.call(|| async { Err::<(), _>("timeout".to_string()) }).await;
            assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
        }

        let blocked = breaker.call(|| async { Ok::<_, String>("unreachable") }).await;
        assert!(matches!(blocked, Err(CircuitBreakerError::CircuitOpen { .. })));
    }
}
