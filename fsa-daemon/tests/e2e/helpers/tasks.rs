//! Scan task doubles.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use fsa_core::outcome::{DependencyInfo, ScanOutcome};
use fsa_core::request::{ScanRequest, ScmSource};
use fsa_core::task::{BoxFuture, ScanTask};
use fsa_scanner::{
    DependencyResolver, DependencyScanTask, ResolverSet, ScannerConfigBuilder, ScannerError,
    SourceFetcher,
};

/// Blocks until released or cancelled; counts runs.
#[derive(Clone, Default)]
pub struct GatedTask {
    pub release: CancellationToken,
    pub runs: Arc<AtomicUsize>,
}

impl GatedTask {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ScanTask for GatedTask {
    fn name(&self) -> &str {
        "gated"
    }

    fn run(&self, _request: ScanRequest, cancel: CancellationToken) -> BoxFuture<'static, ScanOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let release = self.release.clone();
        Box::pin(async move {
            tokio::select! {
                _ = release.cancelled() => ScanOutcome::Success(Vec::new()),
                _ = cancel.cancelled() => ScanOutcome::cancelled(),
            }
        })
    }
}

/// Takes `delay` to stop once cancelled.
pub struct SlowToStopTask {
    pub delay: Duration,
}

impl ScanTask for SlowToStopTask {
    fn name(&self) -> &str {
        "slow-to-stop"
    }

    fn run(&self, _request: ScanRequest, cancel: CancellationToken) -> BoxFuture<'static, ScanOutcome> {
        let delay = self.delay;
        Box::pin(async move {
            cancel.cancelled().await;
            tokio::time::sleep(delay).await;
            ScanOutcome::cancelled()
        })
    }
}

/// Writes a single `deps.lock` instead of cloning.
struct LockFileFetcher;

impl SourceFetcher for LockFileFetcher {
    fn fetch<'a>(
        &'a self,
        _source: &'a ScmSource,
        destination: &'a Path,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ScannerError>> {
        Box::pin(async move {
            std::fs::write(destination.join("deps.lock"), b"slow").map_err(|e| ScannerError::Io {
                path: destination.display().to_string(),
                source: e,
            })
        })
    }
}

/// Blocks its thread for `delay` on every `deps.lock`.
struct SlowResolver {
    delay: Duration,
}

impl DependencyResolver for SlowResolver {
    fn name(&self) -> &str {
        "slow"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|n| n == "deps.lock")
    }

    fn resolve(&self, _content: &[u8], _source_path: &str) -> Result<Vec<DependencyInfo>, ScannerError> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }
}

/// A real dependency scan whose checkouts land in `parent` and whose
/// resolution phase blocks for `delay`.
pub fn slow_scm_task(parent: &Path, delay: Duration) -> DependencyScanTask {
    let config = ScannerConfigBuilder::new()
        .checkout_parent(parent)
        .build()
        .expect("scanner config");
    DependencyScanTask::with_parts(
        config,
        Arc::new(LockFileFetcher),
        ResolverSet::empty().with_resolver(SlowResolver { delay }),
    )
}
