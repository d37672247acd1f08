//! Units of work flowing through the pipeline

use std::sync::Arc;
use std::time::Duration;

use crate::credential::CredentialSource;

/// One authentication attempt to perform
///
/// `seq` is assigned by the dispatcher, starting at 1, and is carried into
/// the matching [`JobResult`] so delivery can be audited.
#[derive(Debug, Clone)]
pub struct Job {
    pub seq: u64,
    pub credential: CredentialSource,
    pub target_service: Arc<str>,
}

/// Outcome of exactly one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub seq: u64,
    pub worker_id: usize,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl JobResult {
    /// Successful attempt
    pub fn success(seq: u64, worker_id: usize, elapsed: Duration) -> Self {
        Self {
            seq,
            worker_id,
            success: true,
            error: None,
            elapsed,
        }
    }

    /// Rejected attempt with its reason
    pub fn failure(seq: u64, worker_id: usize, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            seq,
            worker_id,
            success: false,
            error: Some(error.into()),
            elapsed,
        }
    }

    /// Short status label used in per-attempt log lines
    pub fn status(&self) -> String {
        match &self.error {
            None => "SUCCESS".to_string(),
            Some(e) => format!("FAIL ({})", e),
        }
    }
}
