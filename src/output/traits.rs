//! Result sink traits and record types
//!
//! This module defines the per-URL result record and the trait interface
//! for anything that persists results.

use crate::output::stats::RunStats;
use crate::state::ResultOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Result recorded for one input URL
///
/// Serializes to the dataset record shape
/// `{ url, finalUrl, scrapedAt, jsonLdData, hotelInfo?, error? }`.
/// Bookkeeping fields (outcome, attempts, session) are not part of the
/// serialized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// The URL as supplied in the input
    #[serde(rename = "url")]
    pub original_url: String,

    /// The URL the last attempt ended up on
    pub final_url: String,

    /// When the item finished processing
    #[serde(rename = "scrapedAt")]
    pub timestamp: DateTime<Utc>,

    /// All JSON-LD blocks of the page, document order
    #[serde(rename = "jsonLdData")]
    pub structured_blocks: Vec<Value>,

    /// The block selected as the target entity
    #[serde(rename = "hotelInfo", default, skip_serializing_if = "Option::is_none")]
    pub selected_entity: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip)]
    pub outcome: ResultOutcome,

    /// Fetch attempts made (1 or 2)
    #[serde(skip)]
    pub attempts: u8,

    /// Session used by the last attempt
    #[serde(skip)]
    pub session_id: Option<u64>,

    /// JSON-LD blocks skipped as unparseable on the last attempt
    #[serde(skip)]
    pub parse_failures: usize,
}

impl ExtractionResult {
    /// Returns true if an entity was selected
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Trait for result sinks
///
/// Sinks are shared by all workers and must be thread-safe.
pub trait ResultSink: Send + Sync {
    /// Records the result of one input URL
    fn record_result(&self, result: &ExtractionResult) -> OutputResult<()>;

    /// Records the run summary, called once after all workers finished
    fn record_stats(&self, stats: &RunStats) -> OutputResult<()>;

    /// Flushes buffered output
    fn finalize(&self) -> OutputResult<()> {
        Ok(())
    }

    /// Called instead of `record_stats` when the run aborts
    fn abort(&self) -> OutputResult<()> {
        self.finalize()
    }
}
