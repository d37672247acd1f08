//! Result collection
//!
//! The aggregator is the only owner of the duration sets and the error
//! histogram. It drains exactly the expected number of results, in whatever
//! order workers produce them.

use kdcperf_core::{BenchError, DurationSet, ErrorHistogram, JobResult, LatencyStats, Result};
use tokio::sync::mpsc;

/// Streaming collector for one run
#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    received: usize,
    success: DurationSet,
    failure: DurationSet,
    errors: ErrorHistogram,
}

/// Final per-bucket figures of a completed collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub success_count: usize,
    pub failure_count: usize,
    pub success: LatencyStats,
    pub failure: LatencyStats,
    pub errors: ErrorHistogram,
}

impl Aggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            received: 0,
            success: DurationSet::new(),
            failure: DurationSet::new(),
            errors: ErrorHistogram::new(),
        }
    }

    /// Attribute one result to its bucket
    pub fn record(&mut self, result: JobResult) {
        self.received += 1;
        if result.success {
            self.success.push(result.elapsed);
        } else {
            self.failure.push(result.elapsed);
            let message = result.error.as_deref().unwrap_or("unknown error");
            self.errors.record(message);
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.expected
    }

    /// Receive until `expected` results have been recorded
    ///
    /// `on_result` sees each result before it is recorded. Cancel-safe:
    /// dropping the future keeps everything recorded so far.
    pub async fn collect<F>(
        &mut self,
        results: &mut mpsc::Receiver<JobResult>,
        mut on_result: F,
    ) -> Result<()>
    where
        F: FnMut(&JobResult),
    {
        while !self.is_complete() {
            match results.recv().await {
                Some(result) => {
                    on_result(&result);
                    self.record(result);
                }
                None => {
                    return Err(BenchError::Precondition(format!(
                        "result queue closed after {} of {} results",
                        self.received, self.expected
                    )))
                }
            }
        }
        Ok(())
    }

    /// Compute the statistics of both buckets
    pub fn finish(self) -> Aggregate {
        Aggregate {
            success_count: self.success.len(),
            failure_count: self.failure.len(),
            success: self.success.summary(),
            failure: self.failure.summary(),
            errors: self.errors,
        }
    }
}
