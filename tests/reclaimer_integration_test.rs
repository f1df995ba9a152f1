//! Stale resource recovery through the orchestration core

mod common;

use chrono::Duration;
use common::TestHarness;
use inventory_orchestration::config::OrchestrationConfig;
use inventory_orchestration::constants::jobs;
use inventory_orchestration::locking::LockKey;
use inventory_orchestration::reclaimer::{ProcessingStatus, TrackedResource};
use inventory_orchestration::time::TimeProvider;

fn import_job(harness: &TestHarness, status: ProcessingStatus) -> TrackedResource {
    let now = harness.clock.utc_now();
    TrackedResource {
        tenant_id: "tenant-a".to_string(),
        status,
        started_at: (status == ProcessingStatus::Processing).then_some(now),
        created_at: now,
        error_message: None,
    }
}

#[tokio::test]
async fn test_stuck_import_failed_exactly_once() {
    let harness = TestHarness::new();
    harness
        .resources
        .upsert("import_job", "imp-1", import_job(&harness, ProcessingStatus::Processing));
    harness
        .resources
        .upsert("import_job", "imp-2", import_job(&harness, ProcessingStatus::Pending));
    let lock = harness
        .core
        .locks
        .try_acquire(LockKey::resource("tenant-a", "imp-1"))
        .unwrap();

    harness.clock.advance(Duration::minutes(11));
    let (first, second) = tokio::join!(harness.core.reclaimer.reclaim(), harness.core.reclaimer.reclaim());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.reclaimed + second.reclaimed, 2);
    assert_eq!(first.lock_keys_released + second.lock_keys_released, 1);
    assert_eq!(harness.notifier.count_of("stale_resource_recovered"), 2);
    assert!(!harness.core.locks.is_held(&LockKey::resource("tenant-a", "imp-1")));
    drop(lock);

    for id in ["imp-1", "imp-2"] {
        let stored = harness.resources.get("import_job", id).unwrap();
        assert_eq!(stored.status, ProcessingStatus::Failed);
        assert!(stored.error_message.is_some());
    }
}

#[tokio::test]
async fn test_reclaim_job_registered_and_runs() {
    let harness = TestHarness::new();
    harness
        .resources
        .upsert("import_job", "imp-1", import_job(&harness, ProcessingStatus::Processing));
    harness
        .resources
        .upsert("import_job", "imp-done", import_job(&harness, ProcessingStatus::Completed));

    harness.clock.advance(Duration::minutes(30));
    harness
        .core
        .scheduler
        .trigger(jobs::STALE_RESOURCE_RECLAIM)
        .await
        .unwrap();

    assert_eq!(
        harness.resources.get("import_job", "imp-1").unwrap().status,
        ProcessingStatus::Failed
    );
    assert_eq!(
        harness.resources.get("import_job", "imp-done").unwrap().status,
        ProcessingStatus::Completed
    );
}

#[tokio::test]
async fn test_disabled_reclaimer_has_no_job() {
    let mut config = OrchestrationConfig::default();
    config.reclaimer.enabled = false;
    let harness = TestHarness::with_config(config);

    let names: Vec<String> = harness
        .core
        .job_statuses()
        .into_iter()
        .map(|status| status.name)
        .collect();
    assert_eq!(names, vec![jobs::SLA_SWEEP.to_string(), jobs::ANALYTICS_RECALCULATION.to_string()]);
}
