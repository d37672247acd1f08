//! # kdcperf load generator
//!
//! Measures latency and success rate of Kerberos initial-credential requests
//! under controlled concurrency.
//!
//! ## Features
//!
//! - **Round-robin identities**: one identity, or a whole credential list
//!   rotated across attempts
//! - **Fixed worker pool**: `parallelism` workers, each attempt in its own
//!   throwaway client context
//! - **Split statistics**: mean/max/min/p99/p95 for successes and failures
//!   independently, plus a tally of failure messages
//! - **Fatal vs. recorded failures**: rejected attempts are data; a context
//!   that cannot be built aborts the run
//!
//! ## Usage
//!
//! ```bash
//! # 1000 requests, 20 at a time, as one principal
//! kdcperf -s krbtgt/EXAMPLE.COM@EXAMPLE.COM -i 1000 -p 20 -c alice@EXAMPLE.COM -P secret
//!
//! # Rotate through a list of identities
//! kdcperf -s krbtgt/EXAMPLE.COM@EXAMPLE.COM -i 10000 -p 100 -C users.csv
//! ```

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod kinit;
pub mod report;
pub mod runner;
pub mod worker;

pub use aggregator::{Aggregate, Aggregator};
pub use config::{CredentialConfig, LoadTestConfig};
pub use dispatcher::{DispatchStart, Dispatcher};
pub use kinit::{KinitAuthenticator, KinitSession};
pub use report::RunSummary;
pub use runner::LoadTestRunner;
pub use worker::{PoolHandle, PoolState, PoolStatus, WorkerPool, WorkerReport};
