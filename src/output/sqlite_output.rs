//! SQLite-based result sink
//!
//! This module provides a sink that records each result and the final run
//! statistics directly to the SQLite storage backend.

use crate::output::stats::RunStats;
use crate::output::traits::{ExtractionResult, OutputError, OutputResult, ResultSink};
use crate::storage::{open_storage, RunStatus, Storage};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-based result sink
///
/// Every result becomes one row of the `results` table under the sink's
/// run. Recording the statistics completes the run.
pub struct SqliteSink {
    storage: Arc<Mutex<dyn Storage>>,
    run_id: i64,
}

impl SqliteSink {
    /// Creates a new SQLite sink
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `run_id` - The current run ID
    ///
    /// # Returns
    ///
    /// A new SqliteSink instance
    pub fn new(storage: Arc<Mutex<dyn Storage>>, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    /// Opens the database at `path` and starts a new run in it
    pub fn open(path: &Path, config_hash: &str) -> OutputResult<Self> {
        let mut storage =
            open_storage(path).map_err(|e| OutputError::Storage(e.to_string()))?;
        let run_id = storage
            .create_run(config_hash)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        tracing::info!("Recording run {} in {}", run_id, path.display());

        Ok(Self::new(Arc::new(Mutex::new(storage)), run_id))
    }

    /// The run this sink writes under
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Marks the run as failed, used when the harvest aborts
    pub fn mark_failed(&self) -> OutputResult<()> {
        self.lock()?
            .update_run_status(self.run_id, RunStatus::Failed)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }

    fn lock(&self) -> OutputResult<MutexGuard<'_, dyn Storage + 'static>> {
        self.storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))
    }
}

impl ResultSink for SqliteSink {
    fn record_result(&self, result: &ExtractionResult) -> OutputResult<()> {
        self.lock()?
            .insert_result(self.run_id, result)
            .map_err(|e| OutputError::Storage(e.to_string()))?;
        Ok(())
    }

    fn record_stats(&self, stats: &RunStats) -> OutputResult<()> {
        self.lock()?
            .complete_run(self.run_id, stats)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }

    fn abort(&self) -> OutputResult<()> {
        self.mark_failed()
    }
}
