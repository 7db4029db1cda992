//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::{ExtractionResult, RunStats};
use crate::state::ResultOutcome;
use crate::storage::{RunRecord, RunStatus, StoredResult};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed and stores its statistics
    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()>;

    // ===== Results =====

    /// Stores the result of one input URL
    fn insert_result(&mut self, run_id: i64, result: &ExtractionResult) -> StorageResult<i64>;

    /// Loads all results of a run in insertion order
    fn results_for_run(&self, run_id: i64) -> StorageResult<Vec<StoredResult>>;

    /// Counts results of a run, optionally restricted to one outcome
    fn count_results(&self, run_id: i64, outcome: Option<ResultOutcome>) -> StorageResult<u64>;
}
