//! # Analytics Routing
//!
//! Demand forecasts and stockout predictions come from an external service
//! when the tenant has opted in and the service is healthy, and from a local
//! weighted-average implementation otherwise. The router tags every result
//! with the path that produced it.

pub mod client;
pub mod errors;
pub mod fallback;
pub mod router;
pub mod types;

pub use client::{AnalyticsService, HttpAnalyticsClient};
pub use errors::{AnalyticsError, AnalyticsResult};
pub use fallback::{InMemoryUsageHistory, LocalAnalytics, UsageHistorySource, UsageRecord};
pub use router::{AnalyticsRouter, FeatureFlags, InMemoryFeatureFlags};
pub use types::{
    AnalyticsOperation, AnalyticsOutcome, DailyUsageForecast, ForecastPoint, ForecastResult,
    HealthResponse, ModelMetrics, RouteSource, RoutedResult, StockoutPrediction,
};
