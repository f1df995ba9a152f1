//! Wiring and lifecycle of the orchestration core

mod common;

use common::TestHarness;
use inventory_orchestration::config::{ConfigManager, OrchestrationConfig};
use inventory_orchestration::constants::jobs;
use inventory_orchestration::error::ErrorCategory;
use inventory_orchestration::orchestration::{Collaborators, OrchestrationCore};
use inventory_orchestration::resilience::CircuitState;
use std::fs;
use std::path::PathBuf;

#[test]
fn test_bootstrap_registers_builtin_jobs() {
    let harness = TestHarness::new();
    let statuses = harness.core.job_statuses();

    let names: Vec<&str> = statuses.iter().map(|status| status.name.as_str()).collect();
    assert_eq!(
        names,
        vec![jobs::SLA_SWEEP, jobs::ANALYTICS_RECALCULATION, jobs::STALE_RESOURCE_RECLAIM]
    );
    assert_eq!(statuses[0].interval_ms, 300_000);
    assert!(statuses.iter().all(|status| status.last_run.is_none() && !status.running));

    let breaker = harness.core.circuit_breaker_status();
    assert_eq!(breaker.name, "ml_analytics");
    assert_eq!(breaker.state, CircuitState::Closed);
}

#[test]
fn test_bootstrap_rejects_invalid_config() {
    let mut config = OrchestrationConfig::default();
    config.sla.warning_window_hours = 48.0;
    let collaborators = Collaborators::in_memory(&OrchestrationConfig::default()).unwrap();

    let err = OrchestrationCore::bootstrap(config, collaborators).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Infrastructure);
    assert!(err.to_string().contains("warning_window_hours"));
}

#[tokio::test]
async fn test_start_and_shutdown() {
    let harness = TestHarness::new();
    assert!(!harness.core.is_running());
    assert!(harness.core.start());
    assert!(harness.core.is_running());
    harness.core.shutdown().await;
    assert!(!harness.core.is_running());
}

#[test]
fn test_environment_file_overrides_base() {
    let dir = tempfile::tempdir().unwrap();
    let base: PathBuf = dir.path().join("base.yaml");
    fs::write(&base, "sla:\n  order_request_hours: 24.0\nscheduler:\n  tick_interval_ms: 5000\n").unwrap();
    fs::write(
        dir.path().join("staging.yaml"),
        "sla:\n  order_request_hours: 12.0\ncircuit_breaker:\n  max_failures: 5\n",
    )
    .unwrap();

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging").unwrap();
    let config = manager.config();
    assert_eq!(manager.environment(), "staging");
    assert_eq!(config.sla.order_request_hours, 12.0);
    assert_eq!(config.scheduler.tick_interval_ms, 5000);
    assert_eq!(config.circuit_breaker.max_failures, 5);
    assert_eq!(config.sla.artwork_hours, 48.0);

    let core = OrchestrationCore::bootstrap(
        config.clone(),
        Collaborators::in_memory(config).unwrap(),
    )
    .unwrap();
    assert_eq!(core.order_requests.policy().window_hours, 12.0);
}
