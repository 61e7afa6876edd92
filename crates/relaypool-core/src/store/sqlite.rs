//! SQLite-backed durable store.
//!
//! `accounts` keeps one row per account with the full record as JSON plus
//! the columns used for filtering. `account_events` is append-only and
//! ordered by its autoincrement id.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use relaypool_types::{
    AccountError, AccountFilter, AccountRecord, EventLogEntry, EventQuery, EventType, PoolError,
    Result, StoreError,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};

use super::{compare_by_fairness, keep_newest, monotonic, reset_daily_budgets, AccountStore};
use crate::error::{AppError, AppResult};

const LAST_DAILY_RESET_KEY: &str = "last_daily_reset";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::Corrupt(format!("timestamp out of range: {ms}")))
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        init_schema(&conn)?;
        tracing::debug!("Account store schema ready");
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> AppResult<T>) -> AppResult<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            account_id   TEXT PRIMARY KEY,
            role         TEXT NOT NULL,
            status       TEXT NOT NULL,
            health_score REAL NOT NULL,
            last_used_at INTEGER,
            record_json  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_accounts_role_status ON accounts (role, status);

        CREATE TABLE IF NOT EXISTS account_events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            ts          INTEGER NOT NULL,
            account_id  TEXT NOT NULL,
            event_type  TEXT NOT NULL,
            action_type TEXT,
            detail      TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_events_ts ON account_events (ts);
        CREATE INDEX IF NOT EXISTS idx_events_account ON account_events (account_id, ts);

        CREATE TABLE IF NOT EXISTS maintenance (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn upsert_record(tx: &Transaction<'_>, record: &AccountRecord) -> AppResult<()> {
    let json = serde_json::to_string(record)?;
    tx.execute(
        "INSERT INTO accounts (account_id, role, status, health_score, last_used_at, record_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (account_id) DO UPDATE SET
            role = excluded.role,
            status = excluded.status,
            health_score = excluded.health_score,
            last_used_at = excluded.last_used_at,
            record_json = excluded.record_json",
        params![
            record.account_id,
            record.role.as_str(),
            record.status.as_str(),
            record.health_score,
            record.last_used_at.map(to_millis),
            json,
        ],
    )?;
    Ok(())
}

fn insert_events(tx: &Transaction<'_>, events: &[EventLogEntry]) -> AppResult<()> {
    if events.is_empty() {
        return Ok(());
    }
    let mut last: Option<DateTime<Utc>> = tx
        .query_row("SELECT MAX(ts) FROM account_events", [], |row| row.get::<_, Option<i64>>(0))?
        .map(from_millis)
        .transpose()?;

    let mut stmt = tx.prepare_cached(
        "INSERT INTO account_events (ts, account_id, event_type, action_type, detail)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for entry in events {
        let entry = monotonic(entry, last);
        stmt.execute(params![
            to_millis(entry.timestamp),
            entry.account_id,
            entry.event_type.as_str(),
            entry.action_type,
            entry.detail,
        ])?;
        last = Some(entry.timestamp);
    }
    Ok(())
}

fn decode_record(json: &str) -> AppResult<AccountRecord> {
    Ok(serde_json::from_str(json)?)
}

fn load_record(conn: &Connection, account_id: &str) -> AppResult<Option<AccountRecord>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT record_json FROM accounts WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )
        .optional()?;
    json.as_deref().map(decode_record).transpose()
}

fn exists(conn: &Connection, account_id: &str) -> AppResult<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM accounts WHERE account_id = ?1", [account_id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn row_to_event(
    ts: i64,
    account_id: String,
    event_type: String,
    action_type: Option<String>,
    detail: String,
) -> AppResult<EventLogEntry> {
    let event_type = EventType::parse(&event_type)
        .ok_or_else(|| AppError::Corrupt(format!("unknown event type '{event_type}'")))?;
    Ok(EventLogEntry {
        timestamp: from_millis(ts)?,
        account_id,
        event_type,
        action_type,
        detail,
    })
}

impl SqliteStore {
    fn list_impl(&self, filter: &AccountFilter) -> AppResult<Vec<AccountRecord>> {
        let mut sql = String::from("SELECT record_json FROM accounts WHERE 1 = 1");
        let mut args: Vec<String> = Vec::new();
        if let Some(role) = filter.role {
            args.push(role.as_str().to_string());
            sql.push_str(&format!(" AND role = ?{}", args.len()));
        }
        if !filter.statuses.is_empty() {
            let mut placeholders = Vec::with_capacity(filter.statuses.len());
            for status in &filter.statuses {
                args.push(status.as_str().to_string());
                placeholders.push(format!("?{}", args.len()));
            }
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for json in rows {
            let record = decode_record(&json?)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        records.sort_by(compare_by_fairness);
        Ok(records)
    }

    fn events_impl(&self, query: &EventQuery) -> AppResult<Vec<EventLogEntry>> {
        let mut sql = String::from(
            "SELECT ts, account_id, event_type, action_type, detail FROM account_events WHERE 1 = 1",
        );
        let mut args: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(since) = query.since {
            args.push(to_millis(since).into());
            sql.push_str(&format!(" AND ts >= ?{}", args.len()));
        }
        if let Some(until) = query.until {
            args.push(to_millis(until).into());
            sql.push_str(&format!(" AND ts < ?{}", args.len()));
        }
        if let Some(account_id) = &query.account_id {
            args.push(account_id.clone().into());
            sql.push_str(&format!(" AND account_id = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY id ASC");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (ts, account_id, event_type, action_type, detail) = row?;
            events.push(row_to_event(ts, account_id, event_type, action_type, detail)?);
        }
        Ok(keep_newest(events, query.limit))
    }

    fn reset_daily_impl(&self, today: NaiveDate, now: DateTime<Utc>) -> AppResult<bool> {
        let today_str = today.to_string();
        self.with_tx(|tx| {
            let last: Option<String> = tx
                .query_row(
                    "SELECT value FROM maintenance WHERE key = ?1",
                    [LAST_DAILY_RESET_KEY],
                    |row| row.get(0),
                )
                .optional()?;
            if last.as_deref() == Some(today_str.as_str()) {
                return Ok(false);
            }

            let records: Vec<String> = {
                let mut stmt = tx.prepare("SELECT record_json FROM accounts")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<std::result::Result<_, _>>()?
            };
            for json in records {
                let mut record = decode_record(&json)?;
                if reset_daily_budgets(&mut record, now) {
                    upsert_record(tx, &record)?;
                }
            }

            tx.execute(
                "INSERT INTO maintenance (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![LAST_DAILY_RESET_KEY, today_str],
            )?;
            Ok(true)
        })
    }
}

impl AccountStore for SqliteStore {
    fn get(&self, account_id: &str) -> Result<AccountRecord> {
        let conn = self.conn.lock();
        load_record(&conn, account_id)
            .map_err(PoolError::from)?
            .ok_or_else(|| PoolError::not_found(account_id))
    }

    fn list(&self, filter: &AccountFilter) -> Result<Vec<AccountRecord>> {
        self.list_impl(filter).map_err(PoolError::from)
    }

    fn insert(&self, record: &AccountRecord, events: &[EventLogEntry]) -> Result<()> {
        let inserted = self
            .with_tx(|tx| {
                if exists(tx, &record.account_id)? {
                    return Ok(false);
                }
                upsert_record(tx, record)?;
                insert_events(tx, events)?;
                Ok(true)
            })
            .map_err(PoolError::from)?;
        if inserted {
            Ok(())
        } else {
            Err(AccountError::AlreadyExists { id: record.account_id.clone() }.into())
        }
    }

    fn remove(&self, account_id: &str, events: &[EventLogEntry]) -> Result<()> {
        let removed = self
            .with_tx(|tx| {
                let rows = tx.execute("DELETE FROM accounts WHERE account_id = ?1", [account_id])?;
                if rows == 0 {
                    return Ok(false);
                }
                insert_events(tx, events)?;
                Ok(true)
            })
            .map_err(PoolError::from)?;
        if removed {
            Ok(())
        } else {
            Err(PoolError::not_found(account_id))
        }
    }

    fn append_event(&self, entry: &EventLogEntry) -> Result<()> {
        self.with_tx(|tx| insert_events(tx, std::slice::from_ref(entry))).map_err(PoolError::from)
    }

    fn commit(&self, record: &AccountRecord, events: &[EventLogEntry]) -> Result<()> {
        self.with_tx(|tx| {
            upsert_record(tx, record)?;
            insert_events(tx, events)
        })
        .map_err(|e| {
            tracing::error!(account_id = %record.account_id, "Commit failed: {}", e);
            PoolError::PersistenceFailure(StoreError::from(e))
        })
    }

    fn events(&self, query: &EventQuery) -> Result<Vec<EventLogEntry>> {
        self.events_impl(query).map_err(PoolError::from)
    }

    fn reset_daily_counters(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<bool> {
        self.reset_daily_impl(today, now).map_err(PoolError::from)
    }
}
