//! Durable local store for draw records, backed by SQLite.
//!
//! All SQL runs on tokio-rusqlite's single background connection thread, so
//! writes are serialized and the upsert by `(code, issue)` needs no further
//! coordination. "Newest" is always lexicographic `issue` ordering; issues
//! are opaque ordered tokens, never parsed as dates or integers.
//!
//! The store is an explicitly constructed handle (cheap to clone) with an
//! explicit [`DrawStore::close`]. Every mutation publishes a [`StoreChange`]
//! on a broadcast channel so live subscriptions can re-query.

use std::path::Path;

use chrono::Utc;
use rusqlite::params;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use crate::models::{DrawRecord, WinnerDetail};

/// Bump when the row layout changes; the table is dropped and recreated on
/// mismatch. Callers must not depend on rows surviving a schema change.
const SCHEMA_VERSION: i32 = 1;

/// Change-feed capacity; a lagging subscriber re-queries on overflow.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS draw_history (
        id            TEXT PRIMARY KEY,
        game_type     TEXT NOT NULL,
        name          TEXT NOT NULL,
        code          TEXT NOT NULL,
        issue         TEXT NOT NULL,
        red           TEXT NOT NULL,
        blue          TEXT NOT NULL,
        draw_date     TEXT NOT NULL,
        time_rule     TEXT NOT NULL,
        sale_money    TEXT,
        prize_pool    TEXT,
        winner_detail TEXT,
        created_at    INTEGER NOT NULL,
        updated_at    INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_draw_history_code_issue
        ON draw_history (code, issue DESC);
";

const UPSERT_SQL: &str = "
    INSERT INTO draw_history (
        id, game_type, name, code, issue, red, blue, draw_date, time_rule,
        sale_money, prize_pool, winner_detail, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    ON CONFLICT(id) DO UPDATE SET
        game_type = excluded.game_type,
        name = excluded.name,
        red = excluded.red,
        blue = excluded.blue,
        draw_date = excluded.draw_date,
        time_rule = excluded.time_rule,
        sale_money = excluded.sale_money,
        prize_pool = excluded.prize_pool,
        winner_detail = excluded.winner_detail,
        updated_at = excluded.updated_at
";

const SELECT_COLUMNS: &str =
    "game_type, name, code, issue, red, blue, draw_date, time_rule, \
     sale_money, prize_pool, winner_detail";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

/// A mutation event for live subscriptions.
#[derive(Debug, Clone)]
pub enum StoreChange {
    /// Rows for one lottery code changed.
    Code(String),
    /// The whole table was cleared.
    All,
}

impl StoreChange {
    pub fn touches(&self, code: &str) -> bool {
        match self {
            StoreChange::Code(changed) => changed == code,
            StoreChange::All => true,
        }
    }
}

/// SQLite-backed table of draw records keyed by `(code, issue)`.
#[derive(Clone)]
pub struct DrawStore {
    conn: Connection,
    changes: broadcast::Sender<StoreChange>,
}

impl DrawStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::init(conn).await
    }

    /// Open an in-memory store; contents are lost on close. Intended for
    /// tests and ephemeral consumers.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;

            // Destroy-and-recreate on incompatible schema; no migrations.
            let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            if version != 0 && version != SCHEMA_VERSION {
                warn!(
                    found = version,
                    expected = SCHEMA_VERSION,
                    "incompatible draw store schema, recreating"
                );
                conn.execute_batch("DROP TABLE IF EXISTS draw_history;")?;
            }
            conn.execute_batch(CREATE_TABLE_SQL)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            Ok(())
        })
        .await
        .map_err(map_call_err)?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self { conn, changes })
    }

    /// Subscribe to mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StoreChange) {
        // No receivers is fine; observation is optional.
        let _ = self.changes.send(change);
    }

    /// Most recent row for a code by issue ordering, if any.
    pub async fn latest(&self, code: &str) -> Result<Option<DrawRecord>, StoreError> {
        let code = code.to_string();
        self.conn
            .call(move |conn| -> Result<Option<DrawRecord>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM draw_history \
                     WHERE code = ?1 ORDER BY issue DESC LIMIT 1"
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query_map(params![code], record_from_row)?;
                rows.next().transpose()
            })
            .await
            .map_err(map_call_err)
    }

    /// Exact row for `(code, issue)`, if any.
    pub async fn by_issue(&self, code: &str, issue: &str) -> Result<Option<DrawRecord>, StoreError> {
        let code = code.to_string();
        let issue = issue.to_string();
        self.conn
            .call(move |conn| -> Result<Option<DrawRecord>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM draw_history \
                     WHERE code = ?1 AND issue = ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query_map(params![code, issue], record_from_row)?;
                rows.next().transpose()
            })
            .await
            .map_err(map_call_err)
    }

    /// Top `limit` rows for a code, newest issue first.
    pub async fn history(&self, code: &str, limit: u32) -> Result<Vec<DrawRecord>, StoreError> {
        let code = code.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<DrawRecord>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM draw_history \
                     WHERE code = ?1 ORDER BY issue DESC LIMIT ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![code, limit], record_from_row)?;
                rows.collect()
            })
            .await
            .map_err(map_call_err)
    }

    /// Insert-or-replace one record by `(code, issue)`.
    pub async fn insert(&self, record: &DrawRecord) -> Result<(), StoreError> {
        let row = DrawRow::from_record(record)?;
        let code = record.code.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(UPSERT_SQL, row.params())?;
                Ok(())
            })
            .await
            .map_err(map_call_err)?;
        debug!(code = %code, "draw record upserted");
        self.notify(StoreChange::Code(code));
        Ok(())
    }

    /// Insert-or-replace a batch in one transaction. Emits a single change
    /// event per distinct code.
    pub async fn insert_batch(&self, records: &[DrawRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let rows: Vec<DrawRow> = records
            .iter()
            .map(DrawRow::from_record)
            .collect::<Result<_, _>>()?;
        let mut codes: Vec<String> = records.iter().map(|r| r.code.clone()).collect();
        codes.sort();
        codes.dedup();

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    tx.execute(UPSERT_SQL, row.params())?;
                }
                tx.commit()
            })
            .await
            .map_err(map_call_err)?;
        debug!(count = records.len(), "draw batch upserted");
        for code in codes {
            self.notify(StoreChange::Code(code));
        }
        Ok(())
    }

    /// Delete all rows for a code outside the newest `keep_count` by issue
    /// ordering.
    pub async fn evict_oldest(&self, code: &str, keep_count: u32) -> Result<(), StoreError> {
        let code = code.to_string();
        let code_for_event = code.clone();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM draw_history
                     WHERE code = ?1
                     AND id NOT IN (
                         SELECT id FROM draw_history
                         WHERE code = ?1
                         ORDER BY issue DESC
                         LIMIT ?2
                     )",
                    params![code, keep_count],
                )
            })
            .await
            .map_err(map_call_err)?;
        if deleted > 0 {
            debug!(code = %code_for_event, deleted, "evicted old draw records");
            self.notify(StoreChange::Code(code_for_event));
        }
        Ok(())
    }

    /// Number of rows stored for a code.
    pub async fn count(&self, code: &str) -> Result<u32, StoreError> {
        let code = code.to_string();
        self.conn
            .call(move |conn| -> Result<u32, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM draw_history WHERE code = ?1",
                    params![code],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_call_err)
    }

    /// Delete all rows for a code.
    pub async fn clear(&self, code: &str) -> Result<(), StoreError> {
        let code = code.to_string();
        let code_for_event = code.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM draw_history WHERE code = ?1", params![code])?;
                Ok(())
            })
            .await
            .map_err(map_call_err)?;
        debug!(code = %code_for_event, "cleared cached draws");
        self.notify(StoreChange::Code(code_for_event));
        Ok(())
    }

    /// Delete every row.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM draw_history", [])?;
                Ok(())
            })
            .await
            .map_err(map_call_err)?;
        debug!("cleared all cached draws");
        self.notify(StoreChange::All);
        Ok(())
    }

    /// Tear down the background connection. Clones of this handle become
    /// unusable afterwards.
    pub async fn close(self) -> Result<(), StoreError> {
        self.conn
            .close()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn map_call_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Pre-serialized row parameters; built outside the connection thread so
/// serialization failures surface as store errors, not SQL errors.
struct DrawRow {
    id: String,
    game_type: String,
    name: String,
    code: String,
    issue: String,
    red: String,
    blue: String,
    draw_date: String,
    time_rule: String,
    sale_money: Option<String>,
    prize_pool: Option<String>,
    winner_detail: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl DrawRow {
    fn from_record(record: &DrawRecord) -> Result<Self, StoreError> {
        let winner_detail = record
            .winner_detail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let now = Utc::now().timestamp_millis();
        Ok(Self {
            id: record.storage_id(),
            game_type: record.game_type.clone(),
            name: record.name.clone(),
            code: record.code.clone(),
            issue: record.issue.clone(),
            red: record.red.join(" "),
            blue: record.blue.join(" "),
            draw_date: record.draw_date.clone(),
            time_rule: record.time_rule.clone(),
            sale_money: record.sale_money.clone(),
            prize_pool: record.prize_pool.clone(),
            winner_detail,
            created_at: now,
            updated_at: now,
        })
    }

    fn params(&self) -> [&dyn rusqlite::ToSql; 14] {
        [
            &self.id,
            &self.game_type,
            &self.name,
            &self.code,
            &self.issue,
            &self.red,
            &self.blue,
            &self.draw_date,
            &self.time_rule,
            &self.sale_money,
            &self.prize_pool,
            &self.winner_detail,
            &self.created_at,
            &self.updated_at,
        ]
    }
}

/// Map a selected row back to a domain record. The number columns are
/// re-split on spaces, reproducing the exact stored token order. A corrupt
/// `winner_detail` cell degrades to absent rather than failing the row.
fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrawRecord> {
    let red: String = row.get(4)?;
    let blue: String = row.get(5)?;
    let winner_json: Option<String> = row.get(10)?;
    let winner_detail: Option<Vec<WinnerDetail>> = winner_json.and_then(|json| {
        match serde_json::from_str(&json) {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(error = %e, "corrupt winner_detail cell, treating as absent");
                None
            }
        }
    });

    Ok(DrawRecord {
        game_type: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        issue: row.get(3)?,
        red: split_stored(&red),
        blue: split_stored(&blue),
        draw_date: row.get(6)?,
        time_rule: row.get(7)?,
        sale_money: row.get(8)?,
        prize_pool: row.get(9)?,
        winner_detail,
    })
}

fn split_stored(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}
