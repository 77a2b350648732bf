//! Bounded scan execution -- slots, admission queue, timeouts, isolation.
//!
//! The [`ScanExecutor`] owns a fixed number of scan slots (a
//! [`Semaphore`]) and an admission counter bounded by
//! `max_concurrent_scans + max_queued_scans`. [`ScanExecutor::submit`] never
//! blocks: when both the slots and the queue are full it fails with
//! [`ExecutorError::Busy`].
//!
//! # Task lifecycle
//!
//! ```text
//! submit --> admitted (queued) --> slot acquired (active) --> outcome
//!                                        |
//!                          budget exceeded / request deadline
//!                                        |
//!                         cancel token --> grace --> outcome
//! ```
//!
//! Every scan runs in its own tokio task, so a panic surfaces as a
//! `JoinError` and becomes a `SERVER_FAILURE` outcome for that scan only.
//!
//! A scan keeps its slot until its task returns. When a task outlives the
//! cancel grace period the caller gets its timeout outcome right away, but
//! the slot is only released once the task finishes: blocking work spawned
//! by the task may still own resources such as a checkout directory.
//! [`ScanTask`] implementations must therefore observe their token.
//!
//! [`ScanHandle::wait`] cancels the scan when the caller's deadline passes.
//! Dropping a [`ScanHandle`] does not cancel the scan; its outcome is
//! discarded when it arrives.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use fsa_core::config::ExecutorConfig;
use fsa_core::metrics as m;
use fsa_core::outcome::{ScanOutcome, StatusCode};
use fsa_core::request::ScanRequest;
use fsa_core::task::ScanTask;

/// Errors returned by [`ScanExecutor::submit`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// Every slot and queue entry is taken.
    #[error("executor busy: {capacity} scans already admitted")]
    Busy {
        /// Total admission capacity (slots + queue).
        capacity: usize,
    },

    /// `submit` was called outside a tokio runtime.
    #[error("no tokio runtime available to run the scan")]
    NoRuntime,
}

/// Bounded scan executor.
///
/// Cheap to clone; clones share the same slots and counters.
#[derive(Clone)]
pub struct ScanExecutor {
    inner: Arc<Inner>,
}

struct Inner {
    task: Arc<dyn ScanTask>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    capacity: usize,
    task_timeout: Duration,
    cancel_grace: Duration,
    admitted: AtomicUsize,
    active: AtomicUsize,
    submitted: AtomicU64,
    rejected: AtomicU64,
}

impl ScanExecutor {
    /// Create an executor running `task` under the limits in `config`.
    pub fn new(task: Arc<dyn ScanTask>, config: &ExecutorConfig) -> Self {
        let max_concurrent = config.max_concurrent_scans;
        Self {
            inner: Arc::new(Inner {
                task,
                slots: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
                capacity: max_concurrent.saturating_add(config.max_queued_scans),
                task_timeout: config.task_timeout(),
                cancel_grace: config.cancel_grace(),
                admitted: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                submitted: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    /// Admit a scan and start it as soon as a slot is free.
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::Busy`] when slots and queue are both exhausted
    /// - [`ExecutorError::NoRuntime`] outside a tokio runtime
    pub fn submit(&self, request: ScanRequest) -> Result<ScanHandle, ExecutorError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?;

        let inner = &self.inner;
        let admitted = inner
            .admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < inner.capacity).then_some(n + 1)
            });
        if admitted.is_err() {
            inner.rejected.fetch_add(1, Ordering::Relaxed);
            counter!(m::EXECUTOR_SCANS_REJECTED_TOTAL).increment(1);
            debug!(capacity = inner.capacity, "scan rejected, executor busy");
            return Err(ExecutorError::Busy {
                capacity: inner.capacity,
            });
        }

        inner.submitted.fetch_add(1, Ordering::Relaxed);
        counter!(m::EXECUTOR_SCANS_SUBMITTED_TOTAL).increment(1);

        let admission = Admission {
            inner: Arc::clone(inner),
            running: false,
        };
        admission.publish();

        let scan_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let supervisor = Arc::clone(inner);
        runtime.spawn(
            supervisor
                .supervise(request, admission, cancel.clone(), tx)
                .instrument(info_span!("scan", scan_id = %scan_id)),
        );

        Ok(ScanHandle {
            scan_id,
            rx,
            cancel,
            grace: inner.cancel_grace,
        })
    }

    /// Scans currently holding a slot.
    pub fn active_scans(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Scans admitted but still waiting for a slot.
    pub fn queued_scans(&self) -> usize {
        self.inner
            .admitted
            .load(Ordering::Acquire)
            .saturating_sub(self.active_scans())
    }

    /// Free scan slots.
    pub fn available_slots(&self) -> usize {
        self.inner.slots.available_permits()
    }

    /// Configured number of scan slots.
    pub fn max_concurrent_scans(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Scans accepted since startup.
    pub fn submitted_total(&self) -> u64 {
        self.inner.submitted.load(Ordering::Relaxed)
    }

    /// Scans rejected with `Busy` since startup.
    pub fn rejected_total(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Name of the task this executor runs.
    pub fn task_name(&self) -> &str {
        self.inner.task.name()
    }
}

impl std::fmt::Debug for ScanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanExecutor")
            .field("task", &self.inner.task.name())
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("capacity", &self.inner.capacity)
            .field("active", &self.active_scans())
            .field("queued", &self.queued_scans())
            .finish()
    }
}

impl Inner {
    /// Runs one scan and sends its outcome on `reply`.
    ///
    /// Slot and admission are released before the outcome is sent, except
    /// for a task that ignores cancellation: its caller is answered first
    /// and the slot stays taken until the task returns.
    async fn supervise(
        self: Arc<Self>,
        request: ScanRequest,
        mut admission: Admission,
        cancel: CancellationToken,
        reply: oneshot::Sender<ScanOutcome>,
    ) {
        // receiver gone means the client went away, so send results are ignored
        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("scan cancelled while queued");
                drop(admission);
                let _ = reply.send(ScanOutcome::cancelled());
                return;
            }
            acquired = Arc::clone(&self.slots).acquire_owned() => acquired,
        };
        let Ok(permit) = acquired else {
            drop(admission);
            let _ = reply.send(ScanOutcome::failure(StatusCode::ServerFailure, "executor closed"));
            return;
        };
        admission.start();

        let started = Instant::now();
        let task = Arc::clone(&self.task);
        let token = cancel.clone();
        let mut join = tokio::spawn(
            async move { task.run(request, token).await }.in_current_span(),
        );

        let outcome = match tokio::time::timeout(self.task_timeout, &mut join).await {
            Ok(joined) => joined_outcome(joined),
            Err(_) => {
                counter!(m::EXECUTOR_SCANS_TIMED_OUT_TOTAL).increment(1);
                warn!(
                    budget_secs = self.task_timeout.as_secs_f64(),
                    "scan exceeded its time budget, cancelling"
                );
                cancel.cancel();
                if tokio::time::timeout(self.cancel_grace, &mut join).await.is_err() {
                    warn!(
                        grace_ms = self.cancel_grace.as_millis() as u64,
                        "scan ignored cancellation, holding its slot until it returns"
                    );
                    let _ = reply.send(ScanOutcome::timeout());
                    if let Err(e) = join.await {
                        error!(error = %e, "scan task failed after timeout");
                    }
                    self.finish(permit, admission, started, StatusCode::ServerFailure);
                    return;
                }
                ScanOutcome::timeout()
            }
        };

        self.finish(permit, admission, started, outcome.status());
        let _ = reply.send(outcome);
    }

    fn finish(
        &self,
        permit: OwnedSemaphorePermit,
        admission: Admission,
        started: Instant,
        status: StatusCode,
    ) {
        drop(permit);
        drop(admission);

        counter!(m::EXECUTOR_SCANS_COMPLETED_TOTAL, m::LABEL_STATUS => status.as_str())
            .increment(1);
        histogram!(m::EXECUTOR_SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        debug!(status = %status, elapsed_ms = started.elapsed().as_millis() as u64, "scan finished");
    }
}

fn joined_outcome(joined: Result<ScanOutcome, JoinError>) -> ScanOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_panic() {
                counter!(m::EXECUTOR_SCANS_PANICKED_TOTAL).increment(1);
                error!(error = %e, "scan task panicked");
            } else {
                error!(error = %e, "scan task aborted");
            }
            ScanOutcome::failure(StatusCode::ServerFailure, "scan task failed")
        }
    }
}

/// One admitted scan. Releases its admission (and slot accounting) on drop,
/// including when the supervising task is torn down.
struct Admission {
    inner: Arc<Inner>,
    running: bool,
}

impl Admission {
    fn start(&mut self) {
        self.running = true;
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        self.publish();
    }

    fn publish(&self) {
        let active = self.inner.active.load(Ordering::Acquire);
        let admitted = self.inner.admitted.load(Ordering::Acquire);
        gauge!(m::EXECUTOR_ACTIVE_SCANS).set(active as f64);
        gauge!(m::EXECUTOR_QUEUED_SCANS).set(admitted.saturating_sub(active) as f64);
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if self.running {
            self.inner.active.fetch_sub(1, Ordering::AcqRel);
        }
        self.inner.admitted.fetch_sub(1, Ordering::AcqRel);
        self.publish();
    }
}

/// Handle to a submitted scan.
///
/// Holds a clone of the scan's cancel token, not a drop guard: dropping the
/// handle leaves the scan running.
#[derive(Debug)]
pub struct ScanHandle {
    scan_id: Uuid,
    rx: oneshot::Receiver<ScanOutcome>,
    cancel: CancellationToken,
    grace: Duration,
}

impl ScanHandle {
    /// Identifier used in this scan's log span.
    pub fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    /// Wait up to `timeout` for the outcome.
    ///
    /// Gives `Failure(SERVER_FAILURE, "timeout")` when the wait expires.
    /// An expired wait cancels the scan, queued or running, and gives it the
    /// executor's cancel grace period to release its slot before returning.
    pub async fn wait(mut self, timeout: Duration) -> ScanOutcome {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                ScanOutcome::failure(StatusCode::ServerFailure, "scan supervisor terminated")
            }
            Err(_) => {
                debug!(scan_id = %self.scan_id, "request deadline passed, cancelling scan");
                self.cancel.cancel();
                if tokio::time::timeout(self.grace, &mut self.rx).await.is_err() {
                    warn!(scan_id = %self.scan_id, "scan still winding down after request deadline");
                }
                ScanOutcome::timeout()
            }
        }
    }
}
