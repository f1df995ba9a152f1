//! Local analytics used when the external service is not available.
//!
//! Forecasts are a time-weighted moving average of daily usage: the most
//! recent periods count more, and the band is ±1.96σ of the weighted sample
//! variance (95 %). Stockout dates walk the forecast day by day until the
//! remaining stock is exhausted.

use super::errors::{AnalyticsError, AnalyticsResult};
use super::types::{
    AnalyticsOperation, AnalyticsOutcome, DailyUsageForecast, ForecastPoint, ForecastResult,
    ModelMetrics, StockoutPrediction,
};
use crate::constants::analytics::{CONFIDENCE_Z, RECENT_PERIODS, RECENT_PERIOD_WEIGHT};
use crate::time::SharedTimeProvider;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const ALGORITHM: &str = "weighted_moving_average";
/// Confidence reported when usage has no variance to size an interval from
const NO_VARIANCE_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Read access to historical daily usage
#[async_trait]
pub trait UsageHistorySource: Send + Sync + fmt::Debug {
    /// Daily usage for one item, oldest first
    async fn daily_usage(&self, tenant_id: &str, item_id: &str) -> AnalyticsResult<Vec<UsageRecord>>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryUsageHistory {
    records: Arc<DashMap<(String, String), Vec<UsageRecord>>>,
}

impl InMemoryUsageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tenant_id: &str, item_id: &str, date: NaiveDate, quantity: f64) {
        let mut entry = self
            .records
            .entry((tenant_id.to_string(), item_id.to_string()))
            .or_default();
        entry.push(UsageRecord { date, quantity });
        entry.sort_by_key(|record| record.date);
    }
}

#[async_trait]
impl UsageHistorySource for InMemoryUsageHistory {
    async fn daily_usage(&self, tenant_id: &str, item_id: &str) -> AnalyticsResult<Vec<UsageRecord>> {
        Ok(self
            .records
            .get(&(tenant_id.to_string(), item_id.to_string()))
            .map(|records| records.clone())
            .unwrap_or_default())
    }
}

/// Weights for `n` periods, normalized to sum to 1, with the most recent
/// periods boosted
pub fn time_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let mut weights = vec![1.0; n];
    if n >= RECENT_PERIODS {
        for weight in &mut weights[n - RECENT_PERIODS..] {
            *weight = RECENT_PERIOD_WEIGHT;
        }
    }
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

/// Weighted mean and weighted variance of `values`
pub fn weighted_stats(values: &[f64]) -> (f64, f64) {
    let weights = time_weights(values.len());
    let mean: f64 = values.iter().zip(&weights).map(|(v, w)| v * w).sum();
    let variance: f64 = values
        .iter()
        .zip(&weights)
        .map(|(v, w)| w * (v - mean).powi(2))
        .sum();
    (mean, variance)
}

/// Stockout confidence from usage variability: wider intervals relative to
/// the horizon give lower confidence
pub fn stockout_confidence(days_until_stockout: f64, daily_rate: f64, variance: f64) -> f64 {
    if daily_rate <= 0.0 || days_until_stockout <= 0.0 {
        return 0.0;
    }
    if variance <= 0.0 {
        return NO_VARIANCE_CONFIDENCE;
    }
    let margin_days = CONFIDENCE_Z * (variance.sqrt() / daily_rate) * days_until_stockout.sqrt();
    round_to(1.0 / (1.0 + margin_days / days_until_stockout), 2)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug)]
pub struct LocalAnalytics {
    history: Arc<dyn UsageHistorySource>,
    time: SharedTimeProvider,
}

impl LocalAnalytics {
    pub fn new(history: Arc<dyn UsageHistorySource>, time: SharedTimeProvider) -> Self {
        Self { history, time }
    }

    pub async fn execute(
        &self,
        tenant_id: &str,
        operation: &AnalyticsOperation,
    ) -> AnalyticsResult<AnalyticsOutcome> {
        if operation.horizon_days() == 0 {
            return Err(AnalyticsError::InvalidRequest {
                reason: "horizon_days must be greater than 0".to_string(),
            });
        }

        match operation {
            AnalyticsOperation::Forecast {
                item_id,
                horizon_days,
            } => Ok(AnalyticsOutcome::Forecast(
                self.forecast(tenant_id, item_id, *horizon_days).await?,
            )),
            AnalyticsOperation::StockoutPrediction {
                item_id,
                current_stock,
                horizon_days,
            } => Ok(AnalyticsOutcome::StockoutPrediction(
                self.predict_stockout(tenant_id, item_id, *current_stock, *horizon_days)
                    .await?,
            )),
        }
    }

    pub async fn forecast(
        &self,
        tenant_id: &str,
        item_id: &str,
        horizon_days: u32,
    ) -> AnalyticsResult<ForecastResult> {
        let (points, samples, _) = self.project(tenant_id, item_id, horizon_days).await?;
        Ok(ForecastResult {
            item_id: item_id.to_string(),
            predictions: points,
            model_metrics: ModelMetrics {
                mape: None,
                rmse: None,
                algorithm: Some(ALGORITHM.to_string()),
                training_samples: Some(samples),
            },
            seasonality_detected: false,
        })
    }

    pub async fn predict_stockout(
        &self,
        tenant_id: &str,
        item_id: &str,
        current_stock: i64,
        horizon_days: u32,
    ) -> AnalyticsResult<StockoutPrediction> {
        let (points, _, variance) = self.project(tenant_id, item_id, horizon_days).await?;
        let daily_rate = points.first().map_or(0.0, |point| point.yhat);

        let mut remaining = current_stock as f64;
        let mut daily_usage_forecast = Vec::new();
        let mut stockout: Option<(String, u32)> = None;

        if current_stock > 0 && daily_rate > 0.0 {
            for (index, point) in points.iter().enumerate() {
                let usage = point.yhat.max(0.0);
                remaining -= usage;
                daily_usage_forecast.push(DailyUsageForecast {
                    date: point.date.clone(),
                    predicted_usage: round_to(usage, 2),
                    remaining_stock: round_to(remaining.max(0.0), 2),
                });
                if remaining <= 0.0 {
                    stockout = Some((point.date.clone(), index as u32 + 1));
                    break;
                }
            }
        }

        let confidence = if current_stock > 0 && daily_rate > 0.0 {
            stockout_confidence(current_stock as f64 / daily_rate, daily_rate, variance)
        } else {
            0.0
        };
        daily_usage_forecast.truncate(30);

        Ok(StockoutPrediction {
            item_id: item_id.to_string(),
            predicted_stockout_date: stockout.as_ref().map(|(date, _)| date.clone()),
            days_until_stockout: stockout.map(|(_, days)| days),
            confidence,
            daily_usage_forecast,
        })
    }

    /// Flat projection of the weighted mean over the horizon; returns the
    /// points, the number of history samples and the weighted variance
    async fn project(
        &self,
        tenant_id: &str,
        item_id: &str,
        horizon_days: u32,
    ) -> AnalyticsResult<(Vec<ForecastPoint>, usize, f64)> {
        let history = self.history.daily_usage(tenant_id, item_id).await?;
        let values: Vec<f64> = history.iter().map(|record| record.quantity.max(0.0)).collect();
        let (mean, variance) = if values.is_empty() {
            (0.0, 0.0)
        } else {
            weighted_stats(&values)
        };
        let margin = CONFIDENCE_Z * variance.sqrt();

        let today = self.time.utc_now().date_naive();
        let points = (1..=horizon_days)
            .map(|offset| {
                let date = today
                    .checked_add_days(Days::new(u64::from(offset)))
                    .unwrap_or(today);
                ForecastPoint {
                    date: date.to_string(),
                    yhat: round_to(mean, 2),
                    lower: round_to((mean - margin).max(0.0), 2),
                    upper: round_to(mean + margin, 2),
                }
            })
            .collect();

        debug!(
            tenant_id,
            item_id,
            samples = values.len(),
            mean,
            "Computed local usage projection"
        );
        Ok((points, values.len(), variance))
    }
}
