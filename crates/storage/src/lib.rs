//! Persistent polish history.
//!
//! Records are keyed by their original text: writing a result for text that
//! is already stored supersedes the old record (delete, then insert with a
//! newer timestamp), which moves it to the front of the recency ordering.

mod view;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use polisher_core::{PolishRecord, PolishResult};
use rusqlite::{Connection, Row};
use tokio::sync::watch;

pub use view::HistoryView;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

const SELECT_ALL: &str = "SELECT id, original_text, idiom, explanation, tone_score, timestamp \
     FROM polish_history ORDER BY timestamp DESC, id DESC";

static SHARED: OnceCell<Arc<HistoryStore>> = OnceCell::new();

/// Default on-disk location of the history database.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("polisher")
        .join("history.db")
}

/// SQLite-backed history store.
///
/// All mutations go through one connection mutex, so concurrent upserts for
/// the same text cannot both miss the existing record. After every commit the
/// fresh ordering is pushed to live views, still under the lock, so views
/// observe snapshots in commit order.
pub struct HistoryStore {
    conn: Mutex<Connection>,
    snapshots: watch::Sender<Vec<PolishRecord>>,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Process-wide store, opened on first use.
    ///
    /// Only the first successful call opens `path`; later calls return the
    /// same instance regardless of their argument. A failed open is not
    /// cached, so the next call retries.
    pub fn shared(path: &Path) -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| {
                tracing::info!(path = %path.display(), "Opening shared history store");
                Self::open(path).map(Arc::new)
            })
            .cloned()
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        let initial = query_all(&conn)?;
        let (snapshots, _) = watch::channel(initial);
        Ok(Self {
            conn: Mutex::new(conn),
            snapshots,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }


    /// Replace every record for `original_text` with one built from `result`.
    ///
    /// The new record's timestamp is strictly greater than every timestamp in
    /// the store at the time of the call.
    pub fn upsert(&self, original_text: &str, result: &PolishResult) -> Result<PolishRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let latest: Option<i64> =
            tx.query_row("SELECT MAX(timestamp) FROM polish_history", [], |row| row.get(0))?;
        let timestamp = next_timestamp(chrono::Utc::now().timestamp_millis(), latest);

        let superseded = tx.execute(
            "DELETE FROM polish_history WHERE original_text = ?1",
            [original_text],
        )?;
        tx.execute(
            "INSERT INTO polish_history (original_text, idiom, explanation, tone_score, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                original_text,
                &result.idiom,
                &result.explanation,
                &result.tone_score,
                timestamp,
            ),
        )?;
        let id = tx.last_insert_rowid();
        // Read the new ordering before committing so a committed write
        // always reaches the views.
        let snapshot = query_all(&tx)?;
        tx.commit()?;

        tracing::debug!(id, superseded, timestamp, "History record written");
        self.snapshots.send_replace(snapshot);

        Ok(PolishRecord {
            id,
            original_text: original_text.to_string(),
            idiom: result.idiom.clone(),
            explanation: result.explanation.clone(),
            tone_score: result.tone_score.clone(),
            timestamp,
        })
    }

    /// Remove one record by id.
    pub fn delete(&self, record: &PolishRecord) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let affected = tx.execute("DELETE FROM polish_history WHERE id = ?1", [record.id])?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!("history record {}", record.id)));
        }
        let snapshot = query_all(&tx)?;
        tx.commit()?;
        self.snapshots.send_replace(snapshot);
        Ok(())
    }

    /// Live view of all records, most recent first.
    ///
    /// The view starts at the current snapshot and receives a new one after
    /// every successful mutation for as long as the store lives.
    pub fn list_all(&self) -> HistoryView {
        HistoryView::new(self.snapshots.subscribe())
    }

    /// Read all records straight from the database, most recent first.
    pub fn records(&self) -> Result<Vec<PolishRecord>> {
        let conn = self.lock()?;
        query_all(&conn)
    }

    /// Look up the record stored for `original_text`.
    pub fn find(&self, original_text: &str) -> Result<Option<PolishRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, original_text, idiom, explanation, tone_score, timestamp FROM polish_history WHERE original_text = ?1",
        )?;
        let mut rows = stmt.query_map([original_text], record_from_row)?;
        let record = rows.next().transpose()?;
        Ok(record)
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM polish_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS polish_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_text TEXT NOT NULL,
            idiom TEXT NOT NULL,
            explanation TEXT NOT NULL,
            tone_score TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_polish_history_original ON polish_history(original_text);
        CREATE INDEX IF NOT EXISTS idx_polish_history_timestamp ON polish_history(timestamp DESC);
        "#,
    )?;
    Ok(())
}

fn query_all(conn: &Connection) -> Result<Vec<PolishRecord>> {
    let mut stmt = conn.prepare(SELECT_ALL)?;
    let rows = stmt.query_map([], record_from_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PolishRecord> {
    Ok(PolishRecord {
        id: row.get(0)?,
        original_text: row.get(1)?,
        idiom: row.get(2)?,
        explanation: row.get(3)?,
        tone_score: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

/// Wall-clock milliseconds, bumped past `latest` when the clock has not
/// advanced beyond it.
fn next_timestamp(now_ms: i64, latest: Option<i64>) -> i64 {
    match latest {
        Some(latest) if latest >= now_ms => latest + 1,
        _ => now_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_timestamp_uses_clock_when_ahead() {
        assert_eq!(next_timestamp(1_000, None), 1_000);
        assert_eq!(next_timestamp(1_000, Some(999)), 1_000);
    }

    #[test]
    fn test_next_timestamp_bumps_on_collision() {
        assert_eq!(next_timestamp(1_000, Some(1_000)), 1_001);
        assert_eq!(next_timestamp(1_000, Some(5_000)), 5_001);
    }

    #[test]
    fn test_default_database_path_ends_with_file_name() {
        let path = default_database_path();
        assert!(path.ends_with("polisher/history.db"));
    }
}
