//! # Resilience Module
//!
//! Fault isolation for calls to the external analytics service. A single
//! breaker instance is created at bootstrap and shared by reference with the
//! analytics router.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use inventory_orchestration::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use inventory_orchestration::time::system_time;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new("ml_analytics", CircuitBreakerConfig::default(), system_time());
//!
//! let result = breaker
//!     .call(|| async { Ok::<_, String>("forecast") })
//!     .await;
//! # let _ = result;
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitBreakerStatus, CircuitState};
pub use config::CircuitBreakerConfig;
