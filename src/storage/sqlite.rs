//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::output::{ExtractionResult, RunStats};
use crate::state::ResultOutcome;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
     total_urls, successes, failures, duration_seconds";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Workers insert concurrently with readers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let total_urls: Option<i64> = row.get(5)?;
    let successes: Option<i64> = row.get(6)?;
    let failures: Option<i64> = row.get(7)?;
    let duration: Option<f64> = row.get(8)?;

    let stats = match (total_urls, successes, failures, duration) {
        (Some(total), Some(ok), Some(failed), Some(secs)) => Some(RunStats {
            total_urls: total as u64,
            successes: ok as u64,
            failures: failed as u64,
            duration_seconds: secs,
        }),
        _ => None,
    };

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        stats,
    })
}

/// Columns of a `results` row before JSON decoding
struct RawResult {
    id: i64,
    run_id: i64,
    url: String,
    final_url: String,
    scraped_at: String,
    outcome: String,
    attempts: i64,
    session_id: Option<i64>,
    parse_failures: i64,
    json_ld: String,
    hotel_info: Option<String>,
    error: Option<String>,
}

impl RawResult {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            run_id: row.get(1)?,
            url: row.get(2)?,
            final_url: row.get(3)?,
            scraped_at: row.get(4)?,
            outcome: row.get(5)?,
            attempts: row.get(6)?,
            session_id: row.get(7)?,
            parse_failures: row.get(8)?,
            json_ld: row.get(9)?,
            hotel_info: row.get(10)?,
            error: row.get(11)?,
        })
    }

    fn decode(self) -> StorageResult<StoredResult> {
        let timestamp = DateTime::parse_from_rfc3339(&self.scraped_at)
            .map_err(|e| StorageError::CorruptRow {
                table: "results",
                message: format!("bad scraped_at '{}': {}", self.scraped_at, e),
            })?
            .with_timezone(&Utc);
        let outcome =
            ResultOutcome::from_db_string(&self.outcome).ok_or_else(|| StorageError::CorruptRow {
                table: "results",
                message: format!("unknown outcome '{}'", self.outcome),
            })?;
        let structured_blocks: Vec<Value> = serde_json::from_str(&self.json_ld)?;
        let selected_entity = self
            .hotel_info
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()?;

        Ok(StoredResult {
            id: self.id,
            run_id: self.run_id,
            result: ExtractionResult {
                original_url: self.url,
                final_url: self.final_url,
                timestamp,
                structured_blocks,
                selected_entity,
                error: self.error,
                outcome,
                attempts: self.attempts as u8,
                session_id: self.session_id.map(|id| id as u64),
                parse_failures: self.parse_failures as usize,
            },
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        stmt.query_row(params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], run_from_row).optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, total_urls = ?3, successes = ?4, \
             failures = ?5, duration_seconds = ?6 WHERE id = ?7",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                stats.total_urls as i64,
                stats.successes as i64,
                stats.failures as i64,
                stats.duration_seconds,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Results =====

    fn insert_result(&mut self, run_id: i64, result: &ExtractionResult) -> StorageResult<i64> {
        let json_ld = serde_json::to_string(&result.structured_blocks)?;
        let hotel_info = result
            .selected_entity
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO results (run_id, url, final_url, scraped_at, outcome, attempts, \
             session_id, parse_failures, json_ld, hotel_info, error) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                result.original_url,
                result.final_url,
                result.timestamp.to_rfc3339(),
                result.outcome.to_db_string(),
                result.attempts as i64,
                result.session_id.map(|id| id as i64),
                result.parse_failures as i64,
                json_ld,
                hotel_info,
                result.error
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn results_for_run(&self, run_id: i64) -> StorageResult<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, url, final_url, scraped_at, outcome, attempts, session_id, \
             parse_failures, json_ld, hotel_info, error \
             FROM results WHERE run_id = ?1 ORDER BY id",
        )?;

        let raw = stmt
            .query_map(params![run_id], RawResult::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawResult::decode).collect()
    }

    fn count_results(&self, run_id: i64, outcome: Option<ResultOutcome>) -> StorageResult<u64> {
        let count: i64 = match outcome {
            Some(outcome) => self.conn.query_row(
                "SELECT COUNT(*) FROM results WHERE run_id = ?1 AND outcome = ?2",
                params![run_id, outcome.to_db_string()],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM results WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result(url: &str, outcome: ResultOutcome) -> ExtractionResult {
        let entity = json!({"@type": "Hotel", "name": "Grand Example"});
        let found = outcome == ResultOutcome::EntityFound;
        ExtractionResult {
            original_url: url.to_string(),
            final_url: format!("{}?canonical", url),
            timestamp: Utc::now(),
            structured_blocks: if found { vec![entity.clone()] } else { vec![] },
            selected_entity: if found { Some(entity) } else { None },
            error: if found { None } else { Some("status:403".to_string()) },
            outcome,
            attempts: if found { 1 } else { 2 },
            session_id: Some(3),
            parse_failures: 0,
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "test_hash");
        assert!(run.stats.is_none());
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_get_missing_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_complete_run_stores_stats() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        let stats = RunStats {
            total_urls: 3,
            successes: 2,
            failures: 1,
            duration_seconds: 4.25,
        };

        storage.complete_run(run_id, &stats).unwrap();

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.stats, Some(stats));
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_latest_run_empty_database() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_result_roundtrip_preserves_payload() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        let found = sample_result("https://a.example/1", ResultOutcome::EntityFound);
        let failed = sample_result("https://a.example/2", ResultOutcome::FetchFailed);

        storage.insert_result(run_id, &found).unwrap();
        storage.insert_result(run_id, &failed).unwrap();

        let stored = storage.results_for_run(run_id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].result.original_url, "https://a.example/1");
        assert_eq!(
            stored[0].result.selected_entity.as_ref().unwrap()["name"],
            "Grand Example"
        );
        assert_eq!(stored[0].result.outcome, ResultOutcome::EntityFound);
        assert_eq!(stored[1].result.error.as_deref(), Some("status:403"));
        assert_eq!(stored[1].result.attempts, 2);
        assert_eq!(stored[1].result.session_id, Some(3));
        assert!(stored[1].result.selected_entity.is_none());
    }

    #[test]
    fn test_count_results_by_outcome() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        let other_run = storage.create_run("hash").unwrap();

        storage
            .insert_result(run_id, &sample_result("https://a/1", ResultOutcome::EntityFound))
            .unwrap();
        storage
            .insert_result(run_id, &sample_result("https://a/2", ResultOutcome::FetchFailed))
            .unwrap();
        storage
            .insert_result(run_id, &sample_result("https://a/3", ResultOutcome::FetchFailed))
            .unwrap();
        storage
            .insert_result(other_run, &sample_result("https://b/1", ResultOutcome::EntityFound))
            .unwrap();

        assert_eq!(storage.count_results(run_id, None).unwrap(), 3);
        assert_eq!(
            storage
                .count_results(run_id, Some(ResultOutcome::FetchFailed))
                .unwrap(),
            2
        );
        assert_eq!(
            storage
                .count_results(run_id, Some(ResultOutcome::NoMatchingEntity))
                .unwrap(),
            0
        );
        assert_eq!(storage.count_results(other_run, None).unwrap(), 1);
    }

    #[test]
    fn test_result_for_unknown_run_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.insert_result(
            999,
            &sample_result("https://a/1", ResultOutcome::EntityFound),
        );
        assert!(result.is_err());
    }
}
