//! SQLite Token Store
//!
//! `tracked_tokens` keyed by lowercase address. Milestone history is kept as
//! comma-delimited text and parsed into a `MilestoneSet` on read. Timestamps
//! are Unix milliseconds.

use std::path::Path;
use std::sync::Mutex;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::domain::{normalize_address, MilestoneSet, NewToken, TrackedToken};
use crate::ports::token_store::{StoreError, TokenStore};

/// Default database file name
pub const DEFAULT_DB_FILE: &str = "tokens.db";

const TOKEN_COLUMNS: &str = "token_address, chain, symbol, name, liquidity_usd, market_cap, \
                             baseline_price, milestones_hit, first_seen_at, last_alerted_at";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_tables()?;
        tracing::debug!("Token store opened at {}", path.display());
        Ok(store)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self { conn: Mutex::new(Connection::open_in_memory()?) };
        store.initialize_tables()?;
        Ok(store)
    }

    fn initialize_tables(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tracked_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_address TEXT UNIQUE NOT NULL,
                chain TEXT NOT NULL DEFAULT '',
                symbol TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL DEFAULT '',
                liquidity_usd REAL NOT NULL DEFAULT 0,
                market_cap REAL NOT NULL DEFAULT 0,
                baseline_price REAL NOT NULL DEFAULT 0,
                milestones_hit TEXT NOT NULL DEFAULT '',
                first_seen_at INTEGER NOT NULL,
                last_alerted_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_tracked_first_seen ON tracked_tokens(first_seen_at);",
        )?;

        Ok(())
    }

    /// Delete every token (manual reset)
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let removed = conn.execute("DELETE FROM tracked_tokens", [])?;
        tracing::info!("Cleared {} tokens from store", removed);
        Ok(removed)
    }
}

fn millis_to_datetime(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {}", ms).into(),
        )
    })
}

fn row_to_token(row: &Row<'_>) -> rusqlite::Result<TrackedToken> {
    let milestones: String = row.get(7)?;
    let last_alerted: Option<i64> = row.get(9)?;

    Ok(TrackedToken {
        address: row.get(0)?,
        chain: row.get(1)?,
        symbol: row.get(2)?,
        name: row.get(3)?,
        liquidity_usd: row.get(4)?,
        market_cap: row.get(5)?,
        baseline_price: row.get(6)?,
        milestones_hit: milestones.parse().unwrap_or_default(),
        first_seen_at: millis_to_datetime(row.get(8)?, 8)?,
        last_alerted_at: last_alerted.map(|ms| millis_to_datetime(ms, 9)).transpose()?,
    })
}

impl TokenStore for SqliteTokenStore {
    fn upsert_new(&self, token: &NewToken) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO tracked_tokens
                (token_address, chain, symbol, name, liquidity_usd, market_cap,
                 baseline_price, milestones_hit, first_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', ?8)",
            params![
                normalize_address(&token.address),
                token.chain,
                token.symbol,
                token.name,
                token.liquidity_usd,
                token.market_cap,
                token.baseline_price,
                token.discovered_at.timestamp_millis(),
            ],
        )?;

        Ok(inserted > 0)
    }

    fn list_trackable(&self) -> Result<Vec<TrackedToken>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tracked_tokens WHERE baseline_price > 0 ORDER BY first_seen_at ASC, id ASC",
            TOKEN_COLUMNS
        ))?;

        let tokens = stmt
            .query_map([], row_to_token)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    fn record_milestone(&self, address: &str, label: &str) -> Result<bool, StoreError> {
        let address = normalize_address(address);
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row(
                "SELECT milestones_hit FROM tracked_tokens WHERE token_address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            tracing::debug!("record_milestone: {} is not in the store", address);
            return Ok(false);
        };

        let mut set: MilestoneSet = current.parse().unwrap_or_default();
        if !set.insert(label) {
            return Ok(false);
        }

        tx.execute(
            "UPDATE tracked_tokens SET milestones_hit = ?1, last_alerted_at = ?2 WHERE token_address = ?3",
            params![set.to_string(), Utc::now().timestamp_millis(), address],
        )?;
        tx.commit()?;

        Ok(true)
    }

    fn expire_older_than(&self, max_age: Duration) -> Result<usize, StoreError> {
        // A window reaching past the earliest representable instant keeps everything
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            tracing::debug!("Retention window {}h out of range, nothing expired", max_age.num_hours());
            return Ok(0);
        };
        let cutoff = cutoff.timestamp_millis();
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        let removed = conn.execute(
            "DELETE FROM tracked_tokens WHERE first_seen_at < ?1",
            params![cutoff],
        )?;
        Ok(removed)
    }

    fn is_seen(&self, address: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let seen = conn
            .query_row(
                "SELECT 1 FROM tracked_tokens WHERE token_address = ?1",
                params![normalize_address(address)],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(seen)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracked_tokens", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn recent(&self, limit: usize) -> Result<Vec<TrackedToken>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tracked_tokens ORDER BY first_seen_at DESC, id DESC LIMIT ?1",
            TOKEN_COLUMNS
        ))?;

        let tokens = stmt
            .query_map(params![limit as i64], row_to_token)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens)
    }
}
