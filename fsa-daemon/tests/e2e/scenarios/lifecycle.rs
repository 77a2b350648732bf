//! Build, bind and shutdown behaviour.

use std::sync::Arc;

use tokio::net::TcpStream;

use fsa_daemon::FsaService;

use crate::helpers::RunningService;
use crate::helpers::client::get;
use crate::helpers::config::test_config;
use crate::helpers::tasks::GatedTask;

#[tokio::test]
async fn port_zero_resolves_to_bound_address() {
    let service = FsaService::build_with_task(test_config(), Arc::new(GatedTask::default())).unwrap();
    let addr = service.local_addr();
    assert!(addr.ip().is_loopback());
    assert_ne!(addr.port(), 0);
    assert_eq!(service.executor().task_name(), "gated");
}

#[tokio::test]
async fn shutdown_stops_accepting_connections() {
    let service = FsaService::build_with_task(test_config(), Arc::new(GatedTask::default())).unwrap();
    let running = RunningService::start(service);
    let addr = running.addr;

    assert_eq!(get(addr, "/").await.status, 200);
    running.stop().await.unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn occupied_port_fails_to_build() {
    let first = FsaService::build_with_task(test_config(), Arc::new(GatedTask::default())).unwrap();

    let mut config = test_config();
    config.server.port = first.local_addr().port();
    let second = FsaService::build_with_task(config, Arc::new(GatedTask::default()));

    let err = second.err().expect("second bind should fail");
    assert!(err.to_string().contains("failed to bind"));
}

#[tokio::test]
async fn invalid_config_fails_before_bind() {
    let mut config = test_config();
    config.executor.max_concurrent_scans = 0;

    let err = FsaService::build_with_task(config, Arc::new(GatedTask::default()))
        .err()
        .expect("zero slots should be rejected");
    assert!(err.to_string().contains("config validation failed"));
}

#[tokio::test]
async fn invalid_listen_addr_is_rejected() {
    let mut config = test_config();
    config.server.listen_addr = "not-an-ip".to_owned();

    assert!(FsaService::build_from_config(config).await.is_err());
}

#[tokio::test]
async fn build_falls_back_to_defaults_without_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = fsa_daemon::service::load_config(&dir.path().join("absent.toml"))
        .await
        .unwrap();
    assert_eq!(config.server.port, 8181);
}
