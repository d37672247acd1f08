//! Integration tests for the kdcperf pipeline
//!
//! These tests drive dispatcher, worker pool and aggregator end to end
//! against deterministic in-process authenticators. Latency is simulated
//! with tokio's paused clock so measured durations are exact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kdcperf_core::{
    AuthError, Authenticator, BenchError, CredentialRotator, CredentialSource, Result,
};
use kdcperf_loadtest::{Aggregator, Dispatcher, LoadTestConfig, LoadTestRunner, WorkerPool};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

// ============================================================================
// Fake authenticator
// ============================================================================

#[derive(Clone)]
enum Behaviour {
    Succeed,
    Reject(&'static str),
    Hang,
    BrokenContext,
}

/// Per-identity latency and outcome; unknown identities succeed after 10ms
#[derive(Default)]
struct FakeKdc {
    rules: HashMap<String, (Duration, Behaviour)>,
    attempts: Mutex<Vec<String>>,
}

impl FakeKdc {
    fn rule(mut self, identity: &str, latency: Duration, behaviour: Behaviour) -> Self {
        self.rules.insert(identity.to_string(), (latency, behaviour));
        self
    }

    fn lookup(&self, identity: &str) -> (Duration, Behaviour) {
        self.rules
            .get(identity)
            .cloned()
            .unwrap_or((Duration::from_millis(10), Behaviour::Succeed))
    }
}

#[async_trait]
impl Authenticator for FakeKdc {
    type Session = ();

    fn name(&self) -> &str {
        "fake"
    }

    async fn open_session(&self, credential: &CredentialSource, _target_service: &str) -> Result<()> {
        match self.lookup(credential.identity()).1 {
            Behaviour::BrokenContext => Err(BenchError::Precondition(format!(
                "cannot parse principal '{}'",
                credential.identity()
            ))),
            _ => Ok(()),
        }
    }

    async fn authenticate(
        &self,
        _session: &mut (),
        credential: &CredentialSource,
    ) -> std::result::Result<(), AuthError> {
        self.attempts.lock().push(credential.identity().to_string());
        let (latency, behaviour) = self.lookup(credential.identity());
        match behaviour {
            Behaviour::Hang => std::future::pending().await,
            _ => tokio::time::sleep(latency).await,
        }
        match behaviour {
            Behaviour::Reject(reason) => Err(AuthError::Rejected(reason.to_string())),
            _ => Ok(()),
        }
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn config(iterations: usize, parallelism: usize) -> LoadTestConfig {
    LoadTestConfig {
        target_service: "krbtgt/EXAMPLE.COM@EXAMPLE.COM".to_string(),
        iterations: Some(iterations),
        parallelism: Some(parallelism),
        ..Default::default()
    }
}

fn rotator(identities: &[&str]) -> CredentialRotator {
    CredentialRotator::new(
        identities
            .iter()
            .map(|id| CredentialSource::with_password(*id, "pw"))
            .collect(),
    )
    .unwrap()
}

// ============================================================================
// Completion and ordering
// ============================================================================

mod completion_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_yields_one_result() {
        for (iterations, parallelism) in [(1, 1), (7, 3), (20, 50), (100, 8)] {
            let runner = LoadTestRunner::new(config(iterations, parallelism), FakeKdc::default());
            let summary = runner.run(rotator(&["alice@R"])).await.unwrap();

            assert_eq!(summary.iterations, iterations);
            assert_eq!(summary.success_count + summary.failure_count, iterations);
            assert_eq!(summary.parallelism, parallelism);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_worker_sees_round_robin_order() {
        let runner = LoadTestRunner::new(config(7, 1), FakeKdc::default());
        runner.run(rotator(&["A", "B", "C"])).await.unwrap();

        let attempts = runner.authenticator().attempts.lock().clone();
        assert_eq!(attempts, ["A", "B", "C", "A", "B", "C", "A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_once_delivery() {
        let iterations = 250u64;
        let kdc = Arc::new(FakeKdc::default().rule("slow", ms(40), Behaviour::Succeed));

        let (job_tx, job_rx) = mpsc::channel(16);
        let (result_tx, mut result_rx) = mpsc::channel(iterations as usize);
        let pool = WorkerPool::new(kdc, 12).spawn(job_rx, result_tx);
        let dispatch = tokio::spawn(
            Dispatcher::new(rotator(&["fast", "slow", "other"]), iterations, "svc").run(job_tx),
        );

        let mut seqs = Vec::new();
        let mut aggregator = Aggregator::new(iterations as usize);
        aggregator
            .collect(&mut result_rx, |r| seqs.push(r.seq))
            .await
            .unwrap();

        dispatch.await.unwrap().unwrap();
        let reports = pool.join().await.unwrap();
        assert_eq!(reports.iter().map(|r| r.processed).sum::<u64>(), iterations);

        seqs.sort_unstable();
        let expected: Vec<u64> = (1..=iterations).collect();
        assert_eq!(seqs, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_job_queue_does_not_deadlock() {
        let mut cfg = config(100, 4);
        cfg.queue_capacity = Some(1);

        let summary = LoadTestRunner::new(cfg, FakeKdc::default())
            .run(rotator(&["alice@R"]))
            .await
            .unwrap();
        assert_eq!(summary.success_count, 100);
    }
}

// ============================================================================
// Statistics
// ============================================================================

mod statistics_tests {
    use super::*;

    fn mixed_kdc() -> FakeKdc {
        FakeKdc::default()
            .rule("u1", ms(10), Behaviour::Succeed)
            .rule("u2", ms(20), Behaviour::Succeed)
            .rule("u3", ms(30), Behaviour::Succeed)
            .rule("u4", ms(40), Behaviour::Succeed)
            .rule("t1", ms(5), Behaviour::Reject("timeout"))
            .rule("d1", ms(7), Behaviour::Reject("denied"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_known_latencies() {
        let runner = LoadTestRunner::new(config(4, 2), mixed_kdc());
        let summary = runner.run(rotator(&["u1", "u2", "u3", "u4"])).await.unwrap();

        assert_eq!(summary.success_count, 4);
        assert_eq!(summary.success.mean, ms(25));
        assert_eq!(summary.success.min, ms(10));
        assert_eq!(summary.success.max, ms(40));
        assert!(summary.success.p95 >= ms(30) && summary.success.p95 <= ms(40));
        assert_eq!(summary.success.p95, Duration::from_micros(38_500));
        assert_eq!(summary.success.p99, Duration::from_micros(39_700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_success_leaves_failure_bucket_empty() {
        let runner = LoadTestRunner::new(config(30, 5), mixed_kdc());
        let summary = runner.run(rotator(&["u1", "u2"])).await.unwrap();

        assert_eq!(summary.failure_count, 0);
        assert_eq!(summary.failure.mean, Duration::ZERO);
        assert_eq!(summary.failure.max, Duration::ZERO);
        assert_eq!(summary.failure.min, Duration::ZERO);
        assert_eq!(summary.failure.p99, Duration::ZERO);
        assert_eq!(summary.failure.p95, Duration::ZERO);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_histogram_counts() {
        // Five iterations over [t1, d1, t1, d1, t1] yields 3x timeout, 2x denied.
        let runner = LoadTestRunner::new(config(5, 3), mixed_kdc());
        let summary = runner
            .run(rotator(&["t1", "d1", "t1", "d1", "t1"]))
            .await
            .unwrap();

        assert_eq!(summary.failure_count, 5);
        assert_eq!(summary.errors.count("timeout"), 3);
        assert_eq!(summary.errors.count("denied"), 2);

        let report = summary.render();
        assert!(report.contains("3\ttimeout\n"));
        assert!(report.contains("2\tdenied\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallelism_does_not_change_statistics() {
        let identities = ["u1", "u2", "u3", "u4", "t1", "d1"];

        let serial = LoadTestRunner::new(config(120, 1), mixed_kdc())
            .run(rotator(&identities))
            .await
            .unwrap();
        let parallel = LoadTestRunner::new(config(120, 50), mixed_kdc())
            .run(rotator(&identities))
            .await
            .unwrap();

        assert_eq!(serial.success_count, parallel.success_count);
        assert_eq!(serial.failure_count, parallel.failure_count);
        assert_eq!(serial.success, parallel.success);
        assert_eq!(serial.failure, parallel.failure);
        assert_eq!(serial.errors, parallel.errors);
    }
}

// ============================================================================
// Failure handling
// ============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_broken_context_aborts_run() {
        let kdc = FakeKdc::default().rule("broken", ms(0), Behaviour::BrokenContext);
        let runner = LoadTestRunner::new(config(50, 4), kdc);

        let err = runner
            .run(rotator(&["ok1", "ok2", "broken"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Precondition(ref m) if m.contains("broken")));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out_as_failure() {
        let kdc = FakeKdc::default().rule("stuck", ms(0), Behaviour::Hang);
        let mut cfg = config(6, 3);
        cfg.call_timeout_ms = Some(50);

        let summary = LoadTestRunner::new(cfg, kdc)
            .run(rotator(&["stuck", "alice"]))
            .await
            .unwrap();

        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.failure_count, 3);
        assert_eq!(summary.errors.count("timed out after 50ms"), 3);
        assert_eq!(summary.failure.max, ms(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_run() {
        let kdc = FakeKdc::default().rule("stuck", ms(0), Behaviour::Hang);
        let runner = LoadTestRunner::new(config(10, 2), kdc);

        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let err = runner
            .run_with_shutdown(rotator(&["stuck"]), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Cancelled));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_dispatch() {
        let kdc = FakeKdc::default();
        let runner = LoadTestRunner::new(config(0, 4), kdc);

        let err = runner.run(rotator(&["alice"])).await.unwrap_err();
        assert!(err.is_configuration());
    }
}
