//! Worker pool
//!
//! A fixed number of tokio tasks share one job receiver. Each worker loops
//! receive -> open session -> timed attempt -> report until the job queue is
//! closed and drained. Authentication rejections become failed results;
//! a session that cannot be opened aborts the worker with a fatal error.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kdcperf_core::{AuthError, Authenticator, BenchError, Job, JobResult, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Worker pool lifecycle; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PoolState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
struct StatusInner {
    state: AtomicU8,
    active: AtomicUsize,
}

/// Shared view of the pool lifecycle
#[derive(Debug, Clone)]
pub struct PoolStatus {
    inner: Arc<StatusInner>,
}

impl PoolStatus {
    fn new() -> Self {
        Self {
            inner: Arc::new(StatusInner {
                state: AtomicU8::new(PoolState::Idle as u8),
                active: AtomicUsize::new(0),
            }),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Workers that have not yet exited
    pub fn active_workers(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    fn advance(&self, state: PoolState) {
        self.inner.state.fetch_max(state as u8, Ordering::AcqRel);
    }
}

/// Marks one worker as live; dropping it (normal exit, error or abort)
/// retires the worker and stops the pool once the last one is gone
struct ActiveWorker {
    status: PoolStatus,
}

impl ActiveWorker {
    fn enter(status: &PoolStatus) -> Self {
        status.inner.active.fetch_add(1, Ordering::AcqRel);
        Self {
            status: status.clone(),
        }
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        if self.status.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.status.advance(PoolState::Stopped);
        }
    }
}

// ============================================================================
// POOL
// ============================================================================

/// Per-worker totals returned when a worker exits cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub processed: u64,
}

/// Fixed-size pool of authentication workers
pub struct WorkerPool<A: Authenticator> {
    authenticator: Arc<A>,
    parallelism: usize,
    call_timeout: Option<Duration>,
    verbose: bool,
    status: PoolStatus,
}

impl<A: Authenticator> WorkerPool<A> {
    pub fn new(authenticator: Arc<A>, parallelism: usize) -> Self {
        Self {
            authenticator,
            parallelism,
            call_timeout: None,
            verbose: false,
            status: PoolStatus::new(),
        }
    }

    /// Bound each attempt; expiry is recorded as a failed result
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Log every attempt as it completes
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn status(&self) -> PoolStatus {
        self.status.clone()
    }

    /// Start the workers; ids run from 1 to `parallelism`
    pub fn spawn(
        self,
        job_rx: mpsc::Receiver<Job>,
        result_tx: mpsc::Sender<JobResult>,
    ) -> PoolHandle {
        let jobs = Arc::new(Mutex::new(job_rx));
        let mut tasks = JoinSet::new();

        for worker_id in 1..=self.parallelism {
            let worker = Worker {
                id: worker_id,
                authenticator: self.authenticator.clone(),
                jobs: jobs.clone(),
                results: result_tx.clone(),
                call_timeout: self.call_timeout,
                verbose: self.verbose,
                status: self.status.clone(),
                _active: ActiveWorker::enter(&self.status),
            };
            tasks.spawn(worker.run());
        }
        self.status.advance(PoolState::Running);

        debug!(
            "Spawned {} worker(s) using {}",
            self.parallelism,
            self.authenticator.name()
        );

        PoolHandle {
            tasks,
            finished: Vec::new(),
            status: self.status,
        }
    }
}

/// Running pool
pub struct PoolHandle {
    tasks: JoinSet<Result<WorkerReport>>,
    finished: Vec<WorkerReport>,
    status: PoolStatus,
}

impl PoolHandle {
    pub fn status(&self) -> PoolStatus {
        self.status.clone()
    }

    /// Resolve with the first fatal worker error
    ///
    /// Never resolves if every worker exits cleanly. Cancel-safe: workers
    /// that finish while this is being polled are kept for [`Self::join`].
    pub async fn next_failure(&mut self) -> BenchError {
        loop {
            match self.tasks.join_next().await {
                Some(Ok(Ok(report))) => self.finished.push(report),
                Some(Ok(Err(err))) => return err,
                Some(Err(join_err)) => {
                    return BenchError::Precondition(format!("worker task failed: {}", join_err))
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Wait for every worker to exit
    pub async fn join(mut self) -> Result<Vec<WorkerReport>> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(report)) => self.finished.push(report),
                Ok(Err(err)) => return Err(err),
                Err(join_err) => {
                    return Err(BenchError::Precondition(format!(
                        "worker task failed: {}",
                        join_err
                    )))
                }
            }
        }
        self.finished.sort_by_key(|r| r.worker_id);
        Ok(self.finished)
    }

    /// Abort every worker at its current suspension point
    pub fn abort(&mut self) {
        self.tasks.abort_all();
    }
}

// ============================================================================
// WORKER
// ============================================================================

struct Worker<A: Authenticator> {
    id: usize,
    authenticator: Arc<A>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    results: mpsc::Sender<JobResult>,
    call_timeout: Option<Duration>,
    verbose: bool,
    status: PoolStatus,
    _active: ActiveWorker,
}

impl<A: Authenticator> Worker<A> {
    async fn run(self) -> Result<WorkerReport> {
        debug!("Worker {} started", self.id);
        let mut processed = 0u64;

        loop {
            let job = {
                let mut rx = self.jobs.lock().await;
                rx.recv().await
            };
            let Some(job) = job else {
                self.status.advance(PoolState::Draining);
                break;
            };

            let result = attempt(self.id, &*self.authenticator, &job, self.call_timeout).await?;

            if self.verbose {
                info!(
                    worker_id = self.id,
                    identity = %job.credential.identity(),
                    elapsed = ?result.elapsed,
                    status = %result.status(),
                    "AS_REQ"
                );
            }

            if self.results.send(result).await.is_err() {
                warn!("Worker {}: result queue closed, stopping", self.id);
                break;
            }
            processed += 1;
        }

        debug!("Worker {} completed {} job(s)", self.id, processed);
        Ok(WorkerReport {
            worker_id: self.id,
            processed,
        })
    }
}

/// Run one job: open a fresh session, time the attempt alone, release
pub(crate) async fn attempt<A: Authenticator>(
    worker_id: usize,
    authenticator: &A,
    job: &Job,
    call_timeout: Option<Duration>,
) -> Result<JobResult> {
    let mut session = authenticator
        .open_session(&job.credential, &job.target_service)
        .await?;

    let start = Instant::now();
    let outcome = match call_timeout {
        Some(limit) => {
            match timeout(limit, authenticator.authenticate(&mut session, &job.credential)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AuthError::Rejected(format!("timed out after {:?}", limit))),
            }
        }
        None => {
            authenticator
                .authenticate(&mut session, &job.credential)
                .await
        }
    };
    let elapsed = start.elapsed();
    drop(session);

    match outcome {
        Ok(()) => Ok(JobResult::success(job.seq, worker_id, elapsed)),
        Err(AuthError::Rejected(reason)) => {
            Ok(JobResult::failure(job.seq, worker_id, reason, elapsed))
        }
        Err(AuthError::Precondition(reason)) => Err(BenchError::Precondition(reason)),
    }
}
