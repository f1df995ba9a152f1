//! Analytics routing against a stubbed HTTP analytics service

mod common;

use chrono::Duration;
use common::TestHarness;
use inventory_orchestration::analytics::{AnalyticsOperation, AnalyticsOutcome, RouteSource};
use inventory_orchestration::config::OrchestrationConfig;
use inventory_orchestration::constants::analytics::PRIMARY_SERVICE_FLAG;
use inventory_orchestration::constants::jobs;
use inventory_orchestration::resilience::CircuitState;
use inventory_orchestration::time::TimeProvider;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OrchestrationConfig {
    let mut config = OrchestrationConfig::default();
    config.analytics.base_url = server.uri();
    config
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "service": "ml-analytics"
        })))
        .mount(server)
        .await;
}

fn seed_usage(harness: &TestHarness) {
    let today = harness.clock.utc_now().date_naive();
    for days_ago in 1..=14 {
        harness
            .usage
            .record("t1", "sku-1", today - Duration::days(days_ago), 4.0);
    }
}

fn stockout(stock: i64) -> AnalyticsOperation {
    AnalyticsOperation::StockoutPrediction {
        item_id: "sku-1".to_string(),
        current_stock: stock,
        horizon_days: 30,
    }
}

async fn stockout_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/predict/stockout")
        .count()
}

#[tokio::test]
async fn test_tenant_without_flag_never_calls_service() {
    let server = MockServer::start().await;
    let harness = TestHarness::with_config(config_for(&server));
    seed_usage(&harness);

    let routed = harness.core.analytics.route("t1", &stockout(40)).await.unwrap();
    assert_eq!(routed.source, RouteSource::FallbackOnly);
    assert!(routed.degraded_reason.is_none());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_breaker_opens_after_three_failures_and_recovers() {
    common::init_test_logging();
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/predict/stockout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model unavailable"))
        .mount(&server)
        .await;

    let harness = TestHarness::with_config(config_for(&server));
    harness.flags.enable("t1", PRIMARY_SERVICE_FLAG);
    seed_usage(&harness);
    let router = &harness.core.analytics;

    for attempt in 1..=3 {
        let routed = router.route("t1", &stockout(40)).await.unwrap();
        assert_eq!(routed.source, RouteSource::DegradedFallback, "attempt {attempt}");
        assert!(routed.degraded_reason.unwrap().contains("500"));
    }
    assert_eq!(harness.core.circuit_breaker_status().state, CircuitState::Open);
    assert_eq!(harness.notifier.count_of("circuit_opened"), 1);

    // Open breaker short-circuits without touching the service
    let routed = router.route("t1", &stockout(40)).await.unwrap();
    assert_eq!(routed.source, RouteSource::DegradedFallback);
    assert!(routed.degraded_reason.unwrap().contains("open"));
    assert_eq!(stockout_requests(&server).await, 3);

    server.reset().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/predict/stockout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "product_id": "sku-1",
            "predicted_stockout_date": "2026-11-01",
            "days_until_stockout": 14,
            "confidence": 0.82,
            "daily_usage_forecast": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    harness.clock.advance(Duration::seconds(61));
    let routed = router.route("t1", &stockout(40)).await.unwrap();
    assert_eq!(routed.source, RouteSource::Primary);
    match routed.outcome {
        AnalyticsOutcome::StockoutPrediction(prediction) => {
            assert_eq!(prediction.days_until_stockout, Some(14));
            assert_eq!(prediction.confidence, 0.82);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let status = harness.core.circuit_breaker_status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
    assert_eq!(harness.notifier.count_of("circuit_closed"), 1);
}

#[tokio::test]
async fn test_unhealthy_service_degrades_without_tripping_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let harness = TestHarness::with_config(config_for(&server));
    harness.flags.enable("t1", PRIMARY_SERVICE_FLAG);
    seed_usage(&harness);

    for _ in 0..5 {
        let routed = harness.core.analytics.route("t1", &stockout(40)).await.unwrap();
        assert_eq!(routed.source, RouteSource::DegradedFallback);
    }
    assert_eq!(harness.core.circuit_breaker_status().state, CircuitState::Closed);
    assert_eq!(stockout_requests(&server).await, 0);

    // Health result is cached for the TTL
    let health_probes = server.received_requests().await.unwrap_or_default().len();
    assert_eq!(health_probes, 1);
}

#[tokio::test]
async fn test_recalculation_job_stores_degraded_results() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/predict/stockout"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let harness = TestHarness::with_config(config_for(&server));
    harness.flags.enable("t1", PRIMARY_SERVICE_FLAG);
    seed_usage(&harness);
    harness.workload.track("t1", "sku-1", 20);

    let status = harness
        .core
        .scheduler
        .trigger(jobs::ANALYTICS_RECALCULATION)
        .await
        .unwrap();
    assert_eq!(status.run_count, 1);

    let stored = harness.workload.result("t1", "sku-1").unwrap();
    assert_eq!(stored.source, RouteSource::DegradedFallback);
    match stored.outcome {
        AnalyticsOutcome::StockoutPrediction(prediction) => {
            assert_eq!(prediction.days_until_stockout, Some(5));
            assert_eq!(prediction.daily_usage_forecast.len(), 5);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_half_open_route_does_not_block_recovery() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/predict/stockout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harness = TestHarness::with_config(config_for(&server));
    harness.flags.enable("t1", PRIMARY_SERVICE_FLAG);
    seed_usage(&harness);
    let router = &harness.core.analytics;
    for _ in 0..3 {
        router.route("t1", &stockout(40)).await.unwrap();
    }
    assert_eq!(harness.core.circuit_breaker_status().state, CircuitState::Open);

    // The half-open call hangs and its caller gives up
    server.reset().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/predict/stockout"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;
    harness.clock.advance(Duration::seconds(61));
    let abandoned = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        router.route("t1", &stockout(40)),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(harness.core.circuit_breaker_status().state, CircuitState::HalfOpen);

    server.reset().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/predict/stockout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "product_id": "sku-1",
            "predicted_stockout_date": null,
            "days_until_stockout": null,
            "confidence": 0.9,
            "daily_usage_forecast": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    harness.clock.advance(Duration::hours(24));
    router.invalidate_health_cache();

    let routed = router.route("t1", &stockout(40)).await.unwrap();
    assert_eq!(routed.source, RouteSource::Primary);
    assert_eq!(harness.core.circuit_breaker_status().state, CircuitState::Closed);
}
