//! Job submission

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kdcperf_core::{BenchError, CredentialRotator, Job, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// When the first job was submitted
#[derive(Debug, Clone, Copy)]
pub struct DispatchStart {
    /// Monotonic instant, used for elapsed time
    pub instant: Instant,
    /// Wall-clock time, used in the report
    pub wall: DateTime<Utc>,
}

impl DispatchStart {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Enqueues one job per iteration, rotating credentials round-robin
pub struct Dispatcher {
    rotator: CredentialRotator,
    iterations: u64,
    target_service: Arc<str>,
}

impl Dispatcher {
    pub fn new(rotator: CredentialRotator, iterations: u64, target_service: &str) -> Self {
        Self {
            rotator,
            iterations,
            target_service: Arc::from(target_service),
        }
    }

    /// Submit every job, then close the queue by dropping `job_tx`
    ///
    /// Blocks on a full queue until a worker frees a slot. Fails only if
    /// every worker has gone away with jobs still unsubmitted.
    pub async fn run(mut self, job_tx: mpsc::Sender<Job>) -> Result<DispatchStart> {
        let start = DispatchStart::now();

        for seq in 1..=self.iterations {
            let job = Job {
                seq,
                credential: self.rotator.next_source().clone(),
                target_service: self.target_service.clone(),
            };
            if job_tx.send(job).await.is_err() {
                return Err(BenchError::Precondition(format!(
                    "job queue closed with {} job(s) unsubmitted",
                    self.iterations - seq + 1
                )));
            }
        }

        debug!("Submitted {} job(s)", self.iterations);
        Ok(start)
    }
}
