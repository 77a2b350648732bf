//! Executor saturation and per-scan timeout as seen over HTTP.

use std::sync::Arc;
use std::time::Duration;

use fsa_core::outcome::StatusCode;
use fsa_daemon::FsaService;

use crate::helpers::RunningService;
use crate::helpers::client::post_analyze;
use crate::helpers::config::test_config;
use crate::helpers::tasks::{GatedTask, SlowToStopTask, slow_scm_task};

const BODY: &[u8] = br#"{"dependencyDirs":["/srv/app"],"orgToken":"t"}"#;

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn saturated_executor_answers_503_with_retry_after() {
    let mut config = test_config();
    config.executor.max_concurrent_scans = 1;
    config.executor.max_queued_scans = 0;

    let task = GatedTask::default();
    let service = FsaService::build_with_task(config, Arc::new(task.clone())).unwrap();
    let executor = service.executor().clone();
    let running = RunningService::start(service);
    let addr = running.addr;

    let first = tokio::spawn(async move { post_analyze(addr, BODY).await });
    wait_until(|| executor.active_scans() == 1).await;

    let rejected = post_analyze(addr, BODY).await;
    assert_eq!(rejected.status, 503);
    assert_eq!(rejected.header("retry-after"), Some("5"));
    assert_eq!(task.runs(), 1);

    task.release.cancel();
    let first = first.await.unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(first.envelope().status, StatusCode::Success);

    // the slot is free again
    let again = post_analyze(addr, BODY).await;
    assert_eq!(again.status, 200);
    assert_eq!(executor.rejected_total(), 1);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn queued_scan_runs_when_slot_frees() {
    let mut config = test_config();
    config.executor.max_concurrent_scans = 1;
    config.executor.max_queued_scans = 1;

    let task = GatedTask::default();
    let service = FsaService::build_with_task(config, Arc::new(task.clone())).unwrap();
    let executor = service.executor().clone();
    let running = RunningService::start(service);
    let addr = running.addr;

    let first = tokio::spawn(async move { post_analyze(addr, BODY).await });
    wait_until(|| executor.active_scans() == 1).await;
    let second = tokio::spawn(async move { post_analyze(addr, BODY).await });
    wait_until(|| executor.queued_scans() == 1).await;

    task.release.cancel();
    assert_eq!(first.await.unwrap().status, 200);
    assert_eq!(second.await.unwrap().status, 200);
    assert_eq!(task.runs(), 2);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn task_timeout_is_server_failure_and_frees_slot_once_task_stops() {
    let mut config = test_config();
    config.executor.max_concurrent_scans = 1;
    config.executor.max_queued_scans = 0;
    config.executor.task_timeout_secs = 1;

    let task = SlowToStopTask {
        delay: Duration::from_millis(300),
    };
    let service = FsaService::build_with_task(config, Arc::new(task)).unwrap();
    let executor = service.executor().clone();
    let running = RunningService::start(service);

    let response = post_analyze(running.addr, BODY).await;
    assert_eq!(response.status, 200);
    let envelope = response.envelope();
    assert_eq!(envelope.status, StatusCode::ServerFailure);
    assert_eq!(envelope.result.details, "timeout");

    wait_until(|| executor.available_slots() == 1).await;
    running.stop().await.unwrap();
}

#[tokio::test]
async fn timed_out_scm_scan_keeps_slot_until_checkout_is_removed() {
    let parent = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.executor.max_concurrent_scans = 1;
    config.executor.max_queued_scans = 0;
    config.executor.task_timeout_secs = 1;

    let task = slow_scm_task(parent.path(), Duration::from_millis(1800));
    let service = FsaService::build_with_task(config, Arc::new(task)).unwrap();
    let executor = service.executor().clone();
    let running = RunningService::start(service);

    let body = br#"{"scm":{"type":"git","url":"https://example.com/org/slow.git","user":"","pass":""},"orgToken":"t"}"#;
    let response = post_analyze(running.addr, body).await;
    assert_eq!(response.envelope().result.details, "timeout");

    // resolution is still running inside the checkout
    let checkouts = || std::fs::read_dir(parent.path()).unwrap().count();
    assert_eq!(executor.available_slots(), 0);
    assert_eq!(checkouts(), 1);
    assert_eq!(post_analyze(running.addr, BODY).await.status, 503);

    wait_until(|| executor.available_slots() == 1).await;
    assert_eq!(checkouts(), 0);

    running.stop().await.unwrap();
}
