//! # kdcperf core
//!
//! Domain types for benchmarking Kerberos initial-credential requests.
//!
//! This crate provides the building blocks the load generator composes:
//! - `CredentialSource` / `CredentialRotator` - identities to authenticate as,
//!   handed out in strict round-robin order
//! - `Job` / `JobResult` - one attempt and its outcome
//! - `DurationSet` / `ErrorHistogram` - per-bucket latency statistics and
//!   failure tallies
//! - `Authenticator` - the seam to the service under test
//!
//! ```text
//!   CredentialRotator ──► Job ──► Authenticator ──► JobResult ──► DurationSet
//!                                                              └─► ErrorHistogram
//! ```

pub mod auth;
pub mod credential;
pub mod error;
pub mod job;
pub mod principal;
pub mod rotator;
pub mod stats;

pub use auth::*;
pub use credential::*;
pub use error::*;
pub use job::*;
pub use principal::*;
pub use rotator::*;
pub use stats::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::Authenticator;
    pub use crate::credential::{CredentialSource, KeytabHandle, Secret};
    pub use crate::error::{AuthError, BenchError, Result};
    pub use crate::job::{Job, JobResult};
    pub use crate::principal::Principal;
    pub use crate::rotator::CredentialRotator;
    pub use crate::stats::{DurationSet, ErrorHistogram, LatencyStats};
}
