//! JSON lines dataset writer
//!
//! One JSON object per line: every result record as it completes, followed
//! by the `run-stats` record at the end of the run.

use crate::output::stats::RunStats;
use crate::output::traits::{ExtractionResult, OutputError, OutputResult, ResultSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Appends records to a JSON lines file
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line<T: serde::Serialize + ?Sized>(&self, record: &T) -> OutputResult<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock writer: {}", e)))?;
        writeln!(writer, "{}", line)?;
        Ok(())
    }
}

impl ResultSink for JsonLinesSink {
    fn record_result(&self, result: &ExtractionResult) -> OutputResult<()> {
        self.write_line(result)
    }

    fn record_stats(&self, stats: &RunStats) -> OutputResult<()> {
        self.write_line(&stats.to_record())
    }

    fn finalize(&self) -> OutputResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock writer: {}", e)))?;
        writer.flush()?;
        Ok(())
    }
}
