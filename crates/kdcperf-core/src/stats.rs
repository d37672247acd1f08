//! Latency statistics
//!
//! Percentiles use linear interpolation between closest ranks on the sorted
//! set: for `n` samples and percentile `p`, `rank = p / 100 * (n - 1)` and the
//! result lies `frac(rank)` of the way from `s[floor(rank)]` to
//! `s[ceil(rank)]`. Every statistic of an empty set is `Duration::ZERO`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Append-only collection of attempt durations for one bucket
#[derive(Debug, Clone, Default)]
pub struct DurationSet {
    samples: Vec<Duration>,
}

impl DurationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Compute the summary statistics of the set
    pub fn summary(&self) -> LatencyStats {
        if self.samples.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let total: u128 = sorted.iter().map(Duration::as_nanos).sum();
        let mean = (total as f64 / sorted.len() as f64).round() as u64;

        LatencyStats {
            mean: Duration::from_nanos(mean),
            max: sorted[sorted.len() - 1],
            min: sorted[0],
            p99: percentile(&sorted, 99.0),
            p95: percentile(&sorted, 95.0),
        }
    }
}

impl Extend<Duration> for DurationSet {
    fn extend<T: IntoIterator<Item = Duration>>(&mut self, iter: T) {
        self.samples.extend(iter);
    }
}

impl FromIterator<Duration> for DurationSet {
    fn from_iter<T: IntoIterator<Item = Duration>>(iter: T) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

/// Interpolated percentile of an ascending, non-empty slice
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if upper >= sorted.len() {
        return sorted[sorted.len() - 1];
    }

    let frac = rank - lower as f64;
    let lo = sorted[lower].as_nanos() as f64;
    let hi = sorted[upper].as_nanos() as f64;
    Duration::from_nanos((lo + (hi - lo) * frac).round() as u64)
}

/// Summary of one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean: Duration,
    pub max: Duration,
    pub min: Duration,
    pub p99: Duration,
    pub p95: Duration,
}

/// Occurrence count per distinct failure message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorHistogram {
    counts: HashMap<String, u64>,
}

impl ErrorHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `message`
    pub fn record(&mut self, message: &str) {
        *self.counts.entry(message.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, message: &str) -> u64 {
        self.counts.get(message).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct messages
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries ordered by descending count, then message
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(msg, count)| (msg.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}
