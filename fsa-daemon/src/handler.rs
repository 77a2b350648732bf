//! Request handling -- body in, serialized envelope out.
//!
//! [`RequestHandler::handle`] is transport-neutral: it turns a raw request
//! body into an [`AnalyzeReply`] carrying the exact bytes to send. The HTTP
//! layer only maps the reply variant to a status code.
//!
//! Malformed input is answered without touching the executor.

use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, error, info, warn};

use fsa_core::metrics as m;
use fsa_core::outcome::{ResultEnvelope, StatusCode};
use fsa_core::request::ScanRequest;

use crate::executor::{ExecutorError, ScanExecutor};

/// Result of handling one `/analyze` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeReply {
    /// The scan ran to an outcome (success or failure); serialized envelope.
    Completed(Bytes),
    /// The body was not a valid request; serialized `CLIENT_AGENT_FAILURE` envelope.
    InvalidInput(Bytes),
    /// No scan slot or queue entry was available.
    Overloaded,
    /// The envelope could not be produced.
    Internal(String),
}

/// Translates request bodies into scans and scans into envelopes.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    executor: ScanExecutor,
    request_timeout: Duration,
}

impl RequestHandler {
    /// Create a handler that waits at most `request_timeout` per scan.
    pub fn new(executor: ScanExecutor, request_timeout: Duration) -> Self {
        Self {
            executor,
            request_timeout,
        }
    }

    /// The executor scans are submitted to.
    pub fn executor(&self) -> &ScanExecutor {
        &self.executor
    }

    /// Handle one request body.
    ///
    /// Exactly one reply is produced per call.
    pub async fn handle(&self, body: &[u8]) -> AnalyzeReply {
        let request = match ScanRequest::from_json(body) {
            Ok(request) => request,
            Err(e) => {
                counter!(m::HTTP_INVALID_REQUESTS_TOTAL).increment(1);
                warn!(error = %e, body_len = body.len(), "rejecting invalid analyze request");
                let envelope = ResultEnvelope::failure(
                    StatusCode::ClientAgentFailure,
                    format!("invalid configuration: {e}"),
                );
                return match envelope.to_bytes() {
                    Ok(bytes) => AnalyzeReply::InvalidInput(Bytes::from(bytes)),
                    Err(e) => internal(e),
                };
            }
        };

        info!(
            scm = ?request.scm().map(|s| s.scm_type()),
            local = request.is_local(),
            project = ?request.project_name(),
            includes = request.includes().len(),
            excludes = request.excludes().len(),
            "analyze request accepted"
        );

        let handle = match self.executor.submit(request) {
            Ok(handle) => handle,
            Err(ExecutorError::Busy { capacity }) => {
                warn!(capacity, "executor saturated, rejecting analyze request");
                return AnalyzeReply::Overloaded;
            }
            Err(e) => {
                error!(error = %e, "failed to submit scan");
                return AnalyzeReply::Internal(e.to_string());
            }
        };

        let scan_id = handle.scan_id();
        let outcome = handle.wait(self.request_timeout).await;
        debug!(scan_id = %scan_id, status = %outcome.status(), "scan outcome ready");

        match ResultEnvelope::from(outcome).to_bytes() {
            Ok(bytes) => AnalyzeReply::Completed(Bytes::from(bytes)),
            Err(e) => internal(e),
        }
    }
}

fn internal(e: serde_json::Error) -> AnalyzeReply {
    error!(error = %e, "failed to serialize result envelope");
    AnalyzeReply::Internal(format!("failed to serialize result envelope: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsa_core::config::ExecutorConfig;
    use fsa_core::outcome::ScanOutcome;
    use fsa_core::task::{BoxFuture, ScanTask};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    /// Counts runs and answers with a fixed outcome
    struct SpyTask {
        runs: Arc<AtomicUsize>,
        outcome: ScanOutcome,
    }

    impl ScanTask for SpyTask {
        fn name(&self) -> &str {
            "spy"
        }

        fn run(&self, _request: ScanRequest, _cancel: CancellationToken) -> BoxFuture<'static, ScanOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let outcome = self.outcome.clone();
            Box::pin(async move { outcome })
        }
    }

    /// Never finishes on its own
    struct PendingTask;

    impl ScanTask for PendingTask {
        fn name(&self) -> &str {
            "pending"
        }

        fn run(&self, _request: ScanRequest, cancel: CancellationToken) -> BoxFuture<'static, ScanOutcome> {
            Box::pin(async move {
                cancel.cancelled().await;
                ScanOutcome::cancelled()
            })
        }
    }

    fn executor_config(slots: usize, queue: usize) -> ExecutorConfig {
        ExecutorConfig {
            max_concurrent_scans: slots,
            max_queued_scans: queue,
            task_timeout_secs: 60,
            cancel_grace_ms: 10,
        }
    }

    fn spy(outcome: ScanOutcome) -> (RequestHandler, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = SpyTask {
            runs: Arc::clone(&runs),
            outcome,
        };
        let executor = ScanExecutor::new(Arc::new(task), &executor_config(2, 2));
        (RequestHandler::new(executor, Duration::from_secs(5)), runs)
    }

    const VALID: &[u8] = br#"{"dependencyDirs":["/srv/app"],"orgToken":"t"}"#;

    #[tokio::test]
    async fn scm_type_without_url_never_reaches_executor() {
        let (handler, runs) = spy(ScanOutcome::Success(vec![]));
        let body = br#"{"scm":{"type":"git","user":"","pass":""},"orgToken":"t"}"#;

        let reply = handler.handle(body).await;
        let AnalyzeReply::InvalidInput(bytes) = &reply else {
            panic!("expected invalid input, got {reply:?}");
        };
        let envelope = ResultEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.status, StatusCode::ClientAgentFailure);
        assert!(envelope.result.details.starts_with("invalid configuration: "));
        assert!(envelope.result.projects.is_empty());

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(handler.executor().submitted_total(), 0);
    }

    #[tokio::test]
    async fn unparsable_glob_never_reaches_executor() {
        let (handler, runs) = spy(ScanOutcome::Success(vec![]));
        let body = br#"{"dependencyDirs":["/srv/app"],"includes":["[oops"],"orgToken":"t"}"#;

        let reply = handler.handle(body).await;
        let AnalyzeReply::InvalidInput(bytes) = &reply else {
            panic!("expected invalid input, got {reply:?}");
        };
        let envelope = ResultEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.status, StatusCode::ClientAgentFailure);
        assert!(envelope.result.details.contains("[oops"));

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(handler.executor().submitted_total(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_input() {
        let (handler, runs) = spy(ScanOutcome::Success(vec![]));
        for body in [&b"not json"[..], b"", b"{}", b"[1,2,3]"] {
            assert!(matches!(handler.handle(body).await, AnalyzeReply::InvalidInput(_)));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completed_scan_serializes_outcome() {
        let (handler, runs) = spy(ScanOutcome::Success(vec![]));
        let AnalyzeReply::Completed(bytes) = handler.handle(VALID).await else {
            panic!("expected completed reply");
        };
        let envelope = ResultEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.status, StatusCode::Success);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_scan_is_still_completed() {
        let (handler, _) = spy(ScanOutcome::failure(
            StatusCode::ConnectionFailure,
            "unable to access repository",
        ));
        let AnalyzeReply::Completed(bytes) = handler.handle(VALID).await else {
            panic!("expected completed reply");
        };
        let envelope = ResultEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.status, StatusCode::ConnectionFailure);
        assert_eq!(envelope.result.details, "unable to access repository");
    }

    #[tokio::test]
    async fn saturated_executor_is_overloaded() {
        let executor = ScanExecutor::new(Arc::new(PendingTask), &executor_config(1, 0));
        let handler = RequestHandler::new(executor.clone(), Duration::from_secs(5));

        let _running = executor.submit(ScanRequest::from_json(VALID).unwrap()).unwrap();
        assert_eq!(handler.handle(VALID).await, AnalyzeReply::Overloaded);
    }

    #[tokio::test]
    async fn request_timeout_yields_server_failure() {
        let executor = ScanExecutor::new(Arc::new(PendingTask), &executor_config(1, 0));
        let handler = RequestHandler::new(executor, Duration::from_millis(30));

        let AnalyzeReply::Completed(bytes) = handler.handle(VALID).await else {
            panic!("expected completed reply");
        };
        let envelope = ResultEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.status, StatusCode::ServerFailure);
        assert_eq!(envelope.result.details, "timeout");
    }

    #[tokio::test]
    async fn request_timeout_cancels_scan_and_frees_slot() {
        let config = ExecutorConfig {
            cancel_grace_ms: 500,
            ..executor_config(1, 0)
        };
        let executor = ScanExecutor::new(Arc::new(PendingTask), &config);
        let handler = RequestHandler::new(executor.clone(), Duration::from_millis(50));

        let AnalyzeReply::Completed(bytes) = handler.handle(VALID).await else {
            panic!("expected completed reply");
        };
        let envelope = ResultEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.result.details, "timeout");

        assert_eq!(executor.active_scans(), 0);
        assert_eq!(executor.available_slots(), 1);
        assert!(executor.submit(ScanRequest::from_json(VALID).unwrap()).is_ok());
    }
}
