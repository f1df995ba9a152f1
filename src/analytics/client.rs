//! # Analytics Service Client
//!
//! HTTP client for the external forecasting service. The service is a black
//! box exposing a health check plus forecast and stockout endpoints; any
//! non-2xx answer or transport failure is reported as
//! [`AnalyticsError::ServiceUnavailable`] so the router can count it against
//! the circuit breaker.

use super::errors::{AnalyticsError, AnalyticsResult};
use super::types::{
    AnalyticsOperation, AnalyticsOutcome, ForecastRequest, ForecastResult, HealthResponse,
    StockoutPrediction, StockoutRequest,
};
use crate::config::AnalyticsConfig;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::{debug, warn};

/// Primary analytics backend
#[async_trait]
pub trait AnalyticsService: Send + Sync + fmt::Debug {
    async fn health(&self) -> AnalyticsResult<HealthResponse>;

    async fn forecast(&self, item_id: &str, horizon_days: u32) -> AnalyticsResult<ForecastResult>;

    async fn predict_stockout(
        &self,
        item_id: &str,
        current_stock: i64,
        horizon_days: u32,
    ) -> AnalyticsResult<StockoutPrediction>;

    async fn execute(&self, operation: &AnalyticsOperation) -> AnalyticsResult<AnalyticsOutcome> {
        match operation {
            AnalyticsOperation::Forecast {
                item_id,
                horizon_days,
            } => Ok(AnalyticsOutcome::Forecast(
                self.forecast(item_id, *horizon_days).await?,
            )),
            AnalyticsOperation::StockoutPrediction {
                item_id,
                current_stock,
                horizon_days,
            } => Ok(AnalyticsOutcome::StockoutPrediction(
                self.predict_stockout(item_id, *current_stock, *horizon_days)
                    .await?,
            )),
        }
    }
}

#[derive(Clone)]
pub struct HttpAnalyticsClient {
    client: Client,
    base_url: Url,
}

impl fmt::Debug for HttpAnalyticsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAnalyticsClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpAnalyticsClient {
    pub fn new(config: &AnalyticsConfig) -> AnalyticsResult<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| AnalyticsError::Configuration {
            reason: format!("Invalid base URL '{}': {e}", config.base_url),
        })?;
        // Endpoints are joined relative to the base path, which must end in '/'
        // for its last segment to survive the join
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("inventory-orchestrator/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyticsError::Configuration {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        debug!(base_url = %base_url, "Created analytics service client");
        Ok(Self { client, base_url })
    }

    /// Resolve `path` (relative, no leading slash) under the base URL
    fn endpoint(&self, path: &str) -> AnalyticsResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AnalyticsError::Configuration {
                reason: format!("Invalid endpoint path '{path}': {e}"),
            })
    }

    async fn handle_response<T>(&self, response: reqwest::Response, operation: &str) -> AnalyticsResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AnalyticsError::InvalidResponse {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!(status = %status, error = %error_text, operation, "Analytics service call failed");
        Err(AnalyticsError::service_unavailable(format!(
            "HTTP {status} from {operation}: {error_text}"
        )))
    }
}

#[async_trait]
impl AnalyticsService for HttpAnalyticsClient {
    async fn health(&self) -> AnalyticsResult<HealthResponse> {
        let response = self.client.get(self.endpoint("health")?).send().await?;
        self.handle_response(response, "health").await
    }

    async fn forecast(&self, item_id: &str, horizon_days: u32) -> AnalyticsResult<ForecastResult> {
        let response = self
            .client
            .post(self.endpoint("forecast/demand")?)
            .json(&ForecastRequest {
                product_id: item_id,
                horizon_days,
            })
            .send()
            .await?;
        self.handle_response(response, "forecast").await
    }

    async fn predict_stockout(
        &self,
        item_id: &str,
        current_stock: i64,
        horizon_days: u32,
    ) -> AnalyticsResult<StockoutPrediction> {
        let response = self
            .client
            .post(self.endpoint("predict/stockout")?)
            .json(&StockoutRequest {
                product_id: item_id,
                current_stock,
                horizon_days,
            })
            .send()
            .await?;
        self.handle_response(response, "stockout_prediction").await
    }
}
