//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{CrawlFailure, FailureStage};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunMode, RunRecord, RunStatus, RunTotals};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, mode, status, \
                           trackers_total, trackers_valid, issues_total";

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
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// A ledger column holding a value no enum variant maps to
#[derive(Debug, Error)]
#[error("unrecognized {column} value '{value}'")]
struct UnknownValue {
    column: &'static str,
    value: String,
}

/// Reads a text column and maps it through `parse`, rejecting unknown values
fn enum_column<T>(
    row: &Row<'_>,
    index: usize,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let value: String = row.get(index)?;
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            Box::new(UnknownValue { column, value }),
        )
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        mode: enum_column(row, 4, "mode", RunMode::from_db_string)?,
        status: enum_column(row, 5, "status", RunStatus::from_db_string)?,
        totals: RunTotals {
            trackers_total: row.get(6)?,
            trackers_valid: row.get(7)?,
            issues_total: row.get(8)?,
        },
    })
}

fn failure_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlFailure> {
    let stage = enum_column(row, 0, "stage", FailureStage::parse)?;
    let occurred_at: String = row.get(4)?;
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(CrawlFailure {
        stage,
        tracker_id: row.get(1)?,
        issue_id: row.get(2)?,
        message: row.get(3)?,
        occurred_at,
    })
}

impl Storage for SqliteStorage {
    fn create_run(&mut self, config_hash: &str, mode: RunMode) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, mode, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                config_hash,
                mode.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: RunTotals,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2,
             trackers_total = ?3, trackers_valid = ?4, issues_total = ?5
             WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                totals.trackers_total,
                totals.trackers_valid,
                totals.issues_total,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn record_failures(&mut self, run_id: i64, failures: &[CrawlFailure]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO failures (run_id, stage, tracker_id, issue_id, message, occurred_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for failure in failures {
                stmt.execute(params![
                    run_id,
                    failure.stage.as_str(),
                    failure.tracker_id,
                    failure.issue_id,
                    failure.message,
                    failure.occurred_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn failures_for_run(&self, run_id: i64) -> StorageResult<Vec<CrawlFailure>> {
        let mut stmt = self.conn.prepare(
            "SELECT stage, tracker_id, issue_id, message, occurred_at
             FROM failures WHERE run_id = ?1 ORDER BY id",
        )?;
        let failures = stmt
            .query_map(params![run_id], failure_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(failures)
    }
}
