//! Output module for recording harvest results
//!
//! This module handles:
//! - The per-URL result record and its dataset shape
//! - Result sinks (SQLite, JSON lines, in-memory)
//! - Run statistics and their summary record

mod jsonl;
mod memory;
mod sqlite_output;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use sqlite_output::SqliteSink;
pub use stats::{print_statistics, RunAggregator, RunStats, RunStatsRecord};
pub use traits::{ExtractionResult, OutputError, OutputResult, ResultSink};

use crate::config::OutputConfig;
use std::sync::Arc;

/// Builds the sinks selected by the output configuration
///
/// # Arguments
///
/// * `output` - The output section of the configuration
/// * `config_hash` - Hash recorded with the run in the database
///
/// # Returns
///
/// * `Ok(Vec<Arc<dyn ResultSink>>)` - One sink per configured destination
/// * `Err(OutputError)` - A destination could not be opened
pub fn sinks_from_config(
    output: &OutputConfig,
    config_hash: &str,
) -> OutputResult<Vec<Arc<dyn ResultSink>>> {
    let mut sinks: Vec<Arc<dyn ResultSink>> = Vec::new();

    if let Some(path) = &output.database_path {
        sinks.push(Arc::new(SqliteSink::open(path, config_hash)?));
    }

    if let Some(path) = &output.jsonl_path {
        tracing::info!("Writing dataset to {}", path.display());
        sinks.push(Arc::new(JsonLinesSink::create(path)?));
    }

    Ok(sinks)
}
