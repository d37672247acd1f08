//! Run summary and its text report

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use kdcperf_core::{ErrorHistogram, LatencyStats};
use serde::{Deserialize, Serialize};

use crate::aggregator::Aggregate;

/// Final, immutable result of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub iterations: usize,
    pub parallelism: usize,
    pub requests_per_second: f64,
    pub success_count: usize,
    pub failure_count: usize,
    pub success: LatencyStats,
    pub failure: LatencyStats,
    pub errors: ErrorHistogram,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        elapsed: Duration,
        parallelism: usize,
        aggregate: Aggregate,
    ) -> Self {
        let iterations = aggregate.success_count + aggregate.failure_count;
        let secs = elapsed.as_secs_f64();
        let requests_per_second = if secs > 0.0 {
            iterations as f64 / secs
        } else {
            0.0
        };

        Self {
            started_at,
            elapsed,
            iterations,
            parallelism,
            requests_per_second,
            success_count: aggregate.success_count,
            failure_count: aggregate.failure_count,
            success: aggregate.success,
            failure: aggregate.failure,
            errors: aggregate.errors,
        }
    }

    /// Render the fixed, line-oriented report
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "Start time: {}",
            self.started_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        );
        let _ = writeln!(out, "Elapsed time: {:?}", self.elapsed);
        let _ = writeln!(out, "Average req/s: {:.2}", self.requests_per_second);
        let _ = writeln!(
            out,
            "Parallelism: {}, SUCCESS/FAIL: {}/{}",
            self.parallelism, self.success_count, self.failure_count
        );
        let _ = writeln!(out, "SUCCESS: {}", stats_line(&self.success));
        let _ = writeln!(out, "FAIL: {}", stats_line(&self.failure));
        let _ = writeln!(out, "Errors:");
        for (message, count) in self.errors.sorted() {
            let _ = writeln!(out, "{}\t{}", count, message);
        }
        out
    }

    /// Print the report to stdout
    pub fn print_report(&self) {
        print!("{}", self.render());
    }
}

fn stats_line(stats: &LatencyStats) -> String {
    format!(
        "avg: {:?}, max: {:?}, min: {:?}, 99pct: {:?}, 95pct: {:?}",
        stats.mean, stats.max, stats.min, stats.p99, stats.p95
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn summary() -> RunSummary {
        let mut errors = ErrorHistogram::new();
        for msg in ["denied", "timeout", "timeout", "denied", "timeout"] {
            errors.record(msg);
        }
        let aggregate = Aggregate {
            success_count: 5,
            failure_count: 5,
            success: LatencyStats {
                mean: ms(25),
                max: ms(40),
                min: ms(10),
                p99: Duration::from_micros(39_700),
                p95: Duration::from_micros(38_500),
            },
            failure: LatencyStats::default(),
            errors,
        };
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        RunSummary::new(start, Duration::from_secs(2), 4, aggregate)
    }

    #[test]
    fn test_render_layout() {
        let text = summary().render();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Start time: 2024-03-01T12:00:00.000000Z");
        assert_eq!(lines[1], "Elapsed time: 2s");
        assert_eq!(lines[2], "Average req/s: 5.00");
        assert_eq!(lines[3], "Parallelism: 4, SUCCESS/FAIL: 5/5");
        assert_eq!(
            lines[4],
            "SUCCESS: avg: 25ms, max: 40ms, min: 10ms, 99pct: 39.7ms, 95pct: 38.5ms"
        );
        assert_eq!(
            lines[5],
            "FAIL: avg: 0ns, max: 0ns, min: 0ns, 99pct: 0ns, 95pct: 0ns"
        );
        assert_eq!(lines[6], "Errors:");
        assert_eq!(lines[7], "3\ttimeout");
        assert_eq!(lines[8], "2\tdenied");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_zero_elapsed_throughput() {
        let aggregate = Aggregate {
            success_count: 1,
            failure_count: 0,
            success: LatencyStats::default(),
            failure: LatencyStats::default(),
            errors: ErrorHistogram::new(),
        };
        let summary = RunSummary::new(Utc::now(), Duration::ZERO, 1, aggregate);
        assert_eq!(summary.requests_per_second, 0.0);
    }

    #[test]
    fn test_json_export() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["success_count"], 5);
        assert_eq!(json["errors"]["timeout"], 3);
    }
}
