//! Service assembly and lifecycle.
//!
//! [`FsaService`] is the central coordinator of `fsa-daemon`. It validates
//! configuration, installs the metrics recorder, builds the scan task and
//! executor, binds the connection-limited listener, and serves until a
//! shutdown signal arrives.
//!
//! # Startup Order
//!
//! 1. Validate configuration
//! 2. Metrics recorder (when `metrics.enabled`)
//! 3. Scan task + executor
//! 4. Listener bind (fails fast on address errors)
//!
//! # Shutdown
//!
//! SIGINT/SIGTERM stops accepting connections; in-flight requests finish
//! within their own request timeout.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use fsa_core::config::FsaConfig;
use fsa_core::task::ScanTask;
use fsa_scanner::{DependencyScanTask, ScannerConfig};

use crate::executor::ScanExecutor;
use crate::handler::RequestHandler;
use crate::listener::LimitedListener;
use crate::metrics_server;
use crate::server;

/// The assembled analysis service, bound and ready to serve.
pub struct FsaService {
    config: FsaConfig,
    executor: ScanExecutor,
    listener: LimitedListener,
    local_addr: SocketAddr,
}

impl FsaService {
    /// Load configuration and build the service.
    ///
    /// A missing configuration file falls back to defaults plus
    /// `FSA_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The listen address cannot be bound
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = load_config(config_path).await?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration with the default scan task.
    pub async fn build_from_config(config: FsaConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let scanner_config = ScannerConfig::from_core(&config.scanner);
        scanner_config
            .validate()
            .map_err(|e| anyhow::anyhow!("scanner config validation failed: {}", e))?;
        let task = Arc::new(DependencyScanTask::new(scanner_config));

        Self::build_with_task(config, task)
    }

    /// Build with a caller-supplied scan task.
    ///
    /// Does not install the metrics recorder.
    pub fn build_with_task(config: FsaConfig, task: Arc<dyn ScanTask>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        tracing::info!(
            task = task.name(),
            max_concurrent_scans = config.executor.max_concurrent_scans,
            max_queued_scans = config.executor.max_queued_scans,
            task_timeout_secs = config.executor.task_timeout_secs,
            "initializing scan executor"
        );
        let executor = ScanExecutor::new(task, &config.executor);

        let ip: IpAddr = config
            .server
            .listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid server listen address: {}", e))?;
        let addr = SocketAddr::new(ip, config.server.port);
        let listener = LimitedListener::bind(
            addr,
            config.server.accept_backlog,
            config.server.max_connections,
        )
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;
        let local_addr = axum::serve::Listener::local_addr(&listener)?;

        Ok(Self {
            config,
            executor,
            listener,
            local_addr,
        })
    }

    /// Address the service is bound to (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The scan executor (for introspection).
    pub fn executor(&self) -> &ScanExecutor {
        &self.executor
    }

    /// The loaded configuration.
    pub fn config(&self) -> &FsaConfig {
        &self.config
    }

    /// Serve until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handler = RequestHandler::new(self.executor.clone(), self.config.server.request_timeout());
        let router = server::router(handler, self.config.server.max_body_bytes);

        tracing::info!(
            listen_addr = %self.local_addr,
            max_connections = self.config.server.max_connections,
            "fsa-daemon listening"
        );

        server::serve(self.listener, router, shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

        tracing::info!(
            active_scans = self.executor.active_scans(),
            queued_scans = self.executor.queued_scans(),
            "fsa-daemon stopped accepting requests"
        );
        Ok(())
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            let signal = wait_for_shutdown_signal().await;
            tracing::info!(signal = signal, "shutdown signal received");
        })
        .await
    }
}

/// Load `fsa.toml`, or defaults plus environment when the file is absent.
pub async fn load_config(path: &Path) -> Result<FsaConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        FsaConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))
    } else {
        FsaConfig::from_env().map_err(|e| anyhow::anyhow!("failed to build config: {}", e))
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
