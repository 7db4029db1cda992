//! Run statistics
//!
//! This module provides the run aggregator, which tallies results while
//! workers are running, and the summary record emitted once they finish.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Aggregate statistics of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of input URLs
    pub total_urls: u64,

    /// Results with a selected entity
    pub successes: u64,

    /// Results without a selected entity
    pub failures: u64,

    /// Wall time from aggregator start to finish
    #[serde(rename = "run_duration_seconds")]
    pub duration_seconds: f64,
}

impl RunStats {
    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_urls == 0 {
            return 0.0;
        }
        (self.successes as f64 / self.total_urls as f64) * 100.0
    }

    /// Wraps the stats in the `run-stats` dataset record
    pub fn to_record(&self) -> RunStatsRecord<'_> {
        RunStatsRecord {
            kind: "run-stats",
            stats: self,
        }
    }
}

/// Dataset form of [`RunStats`]: `{ "type": "run-stats", ... }`
#[derive(Debug, Serialize)]
pub struct RunStatsRecord<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,

    #[serde(flatten)]
    pub stats: &'a RunStats,
}

/// Counts successes and failures as results complete
///
/// Counters are atomics so workers can record without a lock.
#[derive(Debug)]
pub struct RunAggregator {
    total_urls: u64,
    started: Instant,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl RunAggregator {
    /// Starts the run clock
    pub fn start(total_urls: usize) -> Self {
        Self {
            total_urls: total_urls as u64,
            started: Instant::now(),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Records one finished item
    pub fn record(&self, success: bool) {
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of items recorded so far
    pub fn completed(&self) -> u64 {
        self.successes.load(Ordering::Relaxed) + self.failures.load(Ordering::Relaxed)
    }

    /// Stops the clock and returns the statistics
    pub fn finish(&self) -> RunStats {
        RunStats {
            total_urls: self.total_urls,
            successes: self.successes.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            duration_seconds: self.started.elapsed().as_secs_f64(),
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStats) {
    println!("=== Run Statistics ===\n");
    println!("  Total URLs: {}", stats.total_urls);
    println!("  Successes: {}", stats.successes);
    println!("  Failures: {}", stats.failures);
    println!("  Duration: {:.2}s", stats.duration_seconds);
    println!();
    println!(
        "Success Rate: {:.1}% ({} / {} URLs yielded an entity)",
        stats.success_rate(),
        stats.successes,
        stats.total_urls
    );
}
