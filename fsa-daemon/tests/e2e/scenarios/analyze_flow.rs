//! Request/response flow through the real dependency scan task.

use std::path::Path;

use fsa_core::outcome::StatusCode;
use fsa_daemon::{FsaService, WELCOME_MESSAGE};

use crate::helpers::RunningService;
use crate::helpers::client::{get, post_analyze};
use crate::helpers::config::{test_config, with_checkout_parent};

const CARGO_LOCK: &str = r#"
version = 3

[[package]]
name = "serde"
version = "1.0.200"
source = "registry+https://github.com/rust-lang/crates.io-index"
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn local_body(dir: &Path) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "dependencyDirs": [dir.display().to_string()],
        "orgToken": "org-token",
    }))
    .unwrap()
}

fn java_only_body(dir: &Path) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "dependencyDirs": [dir.display().to_string()],
        "includes": ["**/*.java"],
        "orgToken": "org-token",
    }))
    .unwrap()
}

async fn start_default() -> RunningService {
    let service = FsaService::build_from_config(test_config())
        .await
        .expect("service should build");
    RunningService::start(service)
}

#[tokio::test]
async fn welcome_returns_exact_bytes() {
    let running = start_default().await;

    let response = get(running.addr, "/").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, WELCOME_MESSAGE.as_bytes());
    assert_eq!(response.content_length(), WELCOME_MESSAGE.len());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn directory_without_manifests_succeeds_with_no_projects() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Main.java", "class Main {}");
    write(dir.path(), "vendor/package-lock.json", "{ not a lock file");
    let running = start_default().await;

    // the lock file would fail resolution if the include filter let it through
    let response = post_analyze(running.addr, &java_only_body(dir.path())).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.content_length(), response.body.len());

    let envelope = response.envelope();
    assert_eq!(envelope.status, StatusCode::Success);
    assert!(envelope.result.projects.is_empty());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn lockfile_is_reported_as_project() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Cargo.lock", CARGO_LOCK);
    let running = start_default().await;

    let body = serde_json::to_vec(&serde_json::json!({
        "dependencyDirs": [dir.path().display().to_string()],
        "orgToken": "org-token",
        "projectName": "billing",
        "projectVersion": "2.1.0",
    }))
    .unwrap();
    let response = post_analyze(running.addr, &body).await;
    assert_eq!(response.status, 200);

    let envelope = response.envelope();
    assert_eq!(envelope.status, StatusCode::Success);
    assert_eq!(envelope.result.projects.len(), 1);
    let project = &envelope.result.projects[0];
    assert_eq!(project.name, "billing");
    assert_eq!(project.version.as_deref(), Some("2.1.0"));
    assert!(project.dependencies.iter().any(|d| d.name == "serde"));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn missing_directory_is_client_failure_with_200() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let running = start_default().await;

    let response = post_analyze(running.addr, &local_body(&missing)).await;
    assert_eq!(response.status, 200);
    let envelope = response.envelope();
    assert_eq!(envelope.status, StatusCode::ClientAgentFailure);
    assert!(envelope.result.projects.is_empty());
    assert!(!envelope.result.details.is_empty());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn unreachable_repository_is_connection_failure() {
    let parent = tempfile::tempdir().unwrap();
    let service = FsaService::build_from_config(with_checkout_parent(parent.path()))
        .await
        .unwrap();
    let running = RunningService::start(service);

    let body = br#"{"scm":{"type":"git","url":"https://127.0.0.1:1/org/repo.git","user":"","pass":""},"orgToken":"t"}"#;
    let response = post_analyze(running.addr, body).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_length(), response.body.len());
    assert_eq!(response.envelope().status, StatusCode::ConnectionFailure);

    running.stop().await.unwrap();

    // the checkout directory is removed after the scan
    let leftovers = std::fs::read_dir(parent.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn malformed_body_is_400_with_envelope() {
    let running = start_default().await;

    for body in [&b"{not json"[..], br#"{"scm":{"type":"git"},"orgToken":"t"}"#] {
        let response = post_analyze(running.addr, body).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.content_length(), response.body.len());
        let envelope = response.envelope();
        assert_eq!(envelope.status, StatusCode::ClientAgentFailure);
        assert!(envelope.result.projects.is_empty());
    }

    running.stop().await.unwrap();
}

#[tokio::test]
async fn unknown_route_is_404() {
    let running = start_default().await;
    assert_eq!(get(running.addr, "/status").await.status, 404);
    running.stop().await.unwrap();
}
