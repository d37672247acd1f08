//! Error types for kdcperf operations

use thiserror::Error;

/// Result type alias for kdcperf operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that abort a benchmark run
///
/// Authentication rejections are not represented here: they are expected
/// outcomes and travel as [`AuthError::Rejected`] into a recorded result.
#[derive(Error, Debug)]
pub enum BenchError {
    // === Configuration (pre-run) ===
    /// Invalid or missing configuration value
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Credential list contained no records
    #[error("configuration error: credential list is empty")]
    EmptyCredentialList,

    /// Credential list record without exactly two fields
    #[error("configuration error: expected 2 fields in credential list at line {line}, found {fields}")]
    MalformedRecord { line: u64, fields: usize },

    /// Credential list could not be read
    #[error("configuration error: cannot read credential list: {0}")]
    Csv(String),

    // === Precondition (mid-run, fatal) ===
    /// A worker could not build its per-call context
    #[error("precondition failure: {0}")]
    Precondition(String),

    // === Run control ===
    /// Run interrupted before all results were collected
    #[error("run cancelled before completion")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Whether the error was raised before any job was dispatched
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::EmptyCredentialList
                | Self::MalformedRecord { .. }
                | Self::Csv(_)
        )
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_configuration() => 2,
            Self::Precondition(_) => 3,
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}

impl From<csv::Error> for BenchError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Failure of a single authentication attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The service rejected the attempt; recorded, never retried
    #[error("{0}")]
    Rejected(String),

    /// The attempt could not even be made; aborts the run
    #[error("{0}")]
    Precondition(String),
}

impl AuthError {
    /// Escalate to a run-aborting error, if this failure is fatal
    pub fn into_fatal(self) -> Option<BenchError> {
        match self {
            Self::Rejected(_) => None,
            Self::Precondition(msg) => Some(BenchError::Precondition(msg)),
        }
    }
}
