use serde::{Deserialize, Serialize};

/// Work the router can send to either the primary service or the fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AnalyticsOperation {
    Forecast {
        item_id: String,
        horizon_days: u32,
    },
    StockoutPrediction {
        item_id: String,
        current_stock: i64,
        horizon_days: u32,
    },
}

impl AnalyticsOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Forecast { .. } => "forecast",
            Self::StockoutPrediction { .. } => "stockout_prediction",
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            Self::Forecast { item_id, .. } | Self::StockoutPrediction { item_id, .. } => item_id,
        }
    }

    pub fn horizon_days(&self) -> u32 {
        match self {
            Self::Forecast { horizon_days, .. } | Self::StockoutPrediction { horizon_days, .. } => {
                *horizon_days
            }
        }
    }
}

/// `POST /forecast/demand` body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ForecastRequest<'a> {
    pub product_id: &'a str,
    pub horizon_days: u32,
}

/// `POST /predict/stockout` body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StockoutRequest<'a> {
    pub product_id: &'a str,
    pub current_stock: i64,
    pub horizon_days: u32,
}

/// One forecast day with its confidence band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(rename = "ds")]
    pub date: String,
    pub yhat: f64,
    #[serde(rename = "yhat_lower")]
    pub lower: f64,
    #[serde(rename = "yhat_upper")]
    pub upper: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub mape: Option<f64>,
    #[serde(default)]
    pub rmse: Option<f64>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub training_samples: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    #[serde(rename = "product_id")]
    pub item_id: String,
    pub predictions: Vec<ForecastPoint>,
    #[serde(default)]
    pub model_metrics: ModelMetrics,
    #[serde(default)]
    pub seasonality_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsageForecast {
    pub date: String,
    pub predicted_usage: f64,
    pub remaining_stock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockoutPrediction {
    #[serde(rename = "product_id")]
    pub item_id: String,
    pub predicted_stockout_date: Option<String>,
    pub days_until_stockout: Option<u32>,
    /// 0.0 - 1.0
    pub confidence: f64,
    #[serde(default)]
    pub daily_usage_forecast: Vec<DailyUsageForecast>,
}

/// `GET /health` body; only `status` is interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnalyticsOutcome {
    Forecast(ForecastResult),
    StockoutPrediction(StockoutPrediction),
}

/// Which path produced a routed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// External service answered
    Primary,
    /// Tenant has not opted into the external service
    FallbackOnly,
    /// Tenant opted in but the external service was unavailable for this call
    DegradedFallback,
}

impl RouteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::FallbackOnly => "fallback_only",
            Self::DegradedFallback => "degraded_fallback",
        }
    }
}

impl std::fmt::Display for RouteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedResult {
    pub source: RouteSource,
    pub outcome: AnalyticsOutcome,
    /// Why the primary was skipped or failed, for degraded results
    pub degraded_reason: Option<String>,
}
