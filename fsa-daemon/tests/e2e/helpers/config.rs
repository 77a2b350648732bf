//! Test configuration builder.

use fsa_core::config::FsaConfig;

/// Loopback, ephemeral port, small limits.
pub fn test_config() -> FsaConfig {
    let mut config = FsaConfig::default();
    config.general.log_format = "pretty".to_owned();
    config.server.listen_addr = "127.0.0.1".to_owned();
    config.server.port = 0;
    config.server.max_connections = 16;
    config.server.request_timeout_secs = 30;
    config.executor.max_concurrent_scans = 2;
    config.executor.max_queued_scans = 2;
    config.executor.task_timeout_secs = 20;
    config.executor.cancel_grace_ms = 50;
    config.scanner.fetch_timeout_secs = 20;
    config.metrics.enabled = false;
    config
}

/// Test config whose scm checkouts land under `parent`.
pub fn with_checkout_parent(parent: &std::path::Path) -> FsaConfig {
    let mut config = test_config();
    config.scanner.checkout_parent = parent.display().to_string();
    config
}
