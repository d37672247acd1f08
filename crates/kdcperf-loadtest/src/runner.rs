//! Pipeline wiring
//!
//! ```text
//!  Dispatcher ──► job queue ──► WorkerPool (P tasks) ──► result queue ──► Aggregator
//!  (spawned)      (bounded)                              (capacity N)     (this task)
//! ```

use std::sync::Arc;

use indicatif::ProgressBar;
use kdcperf_core::{Authenticator, BenchError, CredentialRotator, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::config::LoadTestConfig;
use crate::dispatcher::Dispatcher;
use crate::report::RunSummary;
use crate::worker::WorkerPool;

/// Main load test runner
pub struct LoadTestRunner<A: Authenticator> {
    config: LoadTestConfig,
    authenticator: Arc<A>,
    progress: Option<ProgressBar>,
}

impl<A: Authenticator> LoadTestRunner<A> {
    pub fn new(config: LoadTestConfig, authenticator: A) -> Self {
        Self {
            config,
            authenticator: Arc::new(authenticator),
            progress: None,
        }
    }

    /// Advance `progress` once per collected result
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Run to completion
    pub async fn run(&self, rotator: CredentialRotator) -> Result<RunSummary> {
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.run_with_shutdown(rotator, shutdown_rx).await
    }

    /// Run to completion unless `shutdown` fires first
    ///
    /// A run either returns a summary of all `iterations` attempts or fails;
    /// partial results are never reported.
    pub async fn run_with_shutdown(
        &self,
        rotator: CredentialRotator,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        let iterations = self.config.iterations()?;
        let parallelism = self.config.parallelism()?;

        info!(
            "Starting load test against {}: {} attempt(s), {} worker(s), {} credential(s)",
            self.config.target_service,
            iterations,
            parallelism,
            rotator.len()
        );

        let (job_tx, job_rx) = mpsc::channel(self.config.queue_capacity());
        let (result_tx, mut result_rx) = mpsc::channel(iterations);

        let mut pool = WorkerPool::new(self.authenticator.clone(), parallelism)
            .with_call_timeout(self.config.call_timeout())
            .verbose(self.config.verbose)
            .spawn(job_rx, result_tx);

        let dispatcher = Dispatcher::new(rotator, iterations as u64, &self.config.target_service);
        let dispatch = tokio::spawn(dispatcher.run(job_tx));

        let mut aggregator = Aggregator::new(iterations);
        let progress = self.progress.clone();

        let collected = tokio::select! {
            biased;

            _ = shutdown_signal(&mut shutdown) => Err(BenchError::Cancelled),

            err = pool.next_failure() => Err(err),

            res = aggregator.collect(&mut result_rx, |_| {
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
            }) => res,
        };
        let finished = Instant::now();

        if let Err(err) = collected {
            let status = pool.status();
            warn!(
                "Aborting run after {} of {} result(s): {}",
                aggregator.received(),
                iterations,
                err
            );
            debug!(
                "Pool {:?} with {} active worker(s) at abort",
                status.state(),
                status.active_workers()
            );
            pool.abort();
            dispatch.abort();
            if let Some(pb) = &self.progress {
                pb.abandon();
            }
            return Err(err);
        }

        let start = match dispatch.await {
            Ok(started) => started?,
            Err(join_err) => {
                return Err(BenchError::Precondition(format!(
                    "dispatcher task failed: {}",
                    join_err
                )))
            }
        };
        let reports = pool.join().await?;
        debug!("{} worker(s) stopped", reports.len());

        let elapsed = finished.duration_since(start.instant);
        info!("Load test complete in {:?}", elapsed);

        Ok(RunSummary::new(
            start.wall,
            elapsed,
            parallelism,
            aggregator.finish(),
        ))
    }
}

/// Resolve when a shutdown is requested; a dropped sender means never
async fn shutdown_signal(shutdown: &mut broadcast::Receiver<()>) {
    match shutdown.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => std::future::pending::<()>().await,
    }
}
