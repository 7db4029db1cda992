//! In-memory result sink
//!
//! Keeps every record in memory. Useful when the caller wants to inspect
//! results after the run, and in tests.

use crate::output::stats::RunStats;
use crate::output::traits::{ExtractionResult, OutputError, OutputResult, ResultSink};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<ExtractionResult>>,
    stats: Mutex<Option<RunStats>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results recorded so far, in completion order
    pub fn results(&self) -> Vec<ExtractionResult> {
        self.results.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The run summary, once recorded
    pub fn stats(&self) -> Option<RunStats> {
        self.stats.lock().ok().and_then(|s| s.clone())
    }
}

impl ResultSink for MemorySink {
    fn record_result(&self, result: &ExtractionResult) -> OutputResult<()> {
        self.results
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock results: {}", e)))?
            .push(result.clone());
        Ok(())
    }

    fn record_stats(&self, stats: &RunStats) -> OutputResult<()> {
        *self
            .stats
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock stats: {}", e)))? =
            Some(stats.clone());
        Ok(())
    }
}
