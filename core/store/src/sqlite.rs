//! SQLite-backed credential and history store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use vidrelay_common::{Credential, Error, ProviderId, Result};

use crate::credentials::{CredentialRecord, CredentialStore};
use crate::history::{HistoryRecord, HistoryStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS provider_keys (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        provider TEXT NOT NULL,
        secret TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (user_id, provider)
    );

    CREATE TABLE IF NOT EXISTS upload_history (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        filename TEXT NOT NULL,
        provider TEXT NOT NULL,
        status TEXT NOT NULL,
        url TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_history_user ON upload_history(user_id, created_at);
"#;

/// Credential and history store in one SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn storage(err: rusqlite::Error) -> Error {
    Error::Storage(err.to_string())
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Unknown provider names in the table surface as a conversion error.
fn provider_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ProviderId> {
    let name: String = row.get(idx)?;
    name.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
        )
    })
}

fn credential_record(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    Ok(CredentialRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider: provider_column(row, 2)?,
        created_at: from_millis(row.get(3)?),
        updated_at: from_millis(row.get(4)?),
    })
}

fn history_record(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        filename: row.get(2)?,
        provider: provider_column(row, 3)?,
        status: row.get(4)?,
        url: row.get(5)?,
        created_at: from_millis(row.get(6)?),
    })
}

impl SqliteStore {
    /// Create or open a store database.
    ///
    /// # Errors
    /// - Database creation or migration failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(storage)?;
        conn.execute_batch(SCHEMA).map_err(storage)?;

        info!("Store opened at {}", db_path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("database lock poisoned".to_string()))
    }
}

impl CredentialStore for SqliteStore {
    fn get(&self, user_id: &str, provider: ProviderId) -> Result<Option<Credential>> {
        let secret: Option<String> = self
            .conn()?
            .query_row(
                "SELECT secret FROM provider_keys WHERE user_id = ?1 AND provider = ?2",
                params![user_id, provider.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;

        secret.map(Credential::new).transpose()
    }

    fn set(&self, user_id: &str, provider: ProviderId, credential: &Credential) -> Result<()> {
        debug!("Storing {} credential for user {}", provider, user_id);
        let now = to_millis(Utc::now());
        self.conn()?
            .execute(
                r#"
                INSERT INTO provider_keys (id, user_id, provider, secret, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ON CONFLICT (user_id, provider)
                DO UPDATE SET secret = excluded.secret, updated_at = excluded.updated_at
                "#,
                params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    provider.as_str(),
                    credential.expose(),
                    now,
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    fn delete(&self, user_id: &str, provider: ProviderId) -> Result<bool> {
        debug!("Deleting {} credential for user {}", provider, user_id);
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM provider_keys WHERE user_id = ?1 AND provider = ?2",
                params![user_id, provider.as_str()],
            )
            .map_err(storage)?;
        Ok(removed > 0)
    }

    fn configured(&self, user_id: &str) -> Result<Vec<ProviderId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT provider FROM provider_keys WHERE user_id = ?1")
            .map_err(storage)?;
        let rows = stmt
            .query_map([user_id], |row| provider_column(row, 0))
            .map_err(storage)?;

        let mut providers = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)?;
        providers.sort();
        Ok(providers)
    }

    fn list_all(&self) -> Result<Vec<CredentialRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, user_id, provider, created_at, updated_at
                FROM provider_keys ORDER BY created_at DESC
                "#,
            )
            .map_err(storage)?;
        let rows = stmt.query_map([], credential_record).map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    fn delete_by_id(&self, id: &str) -> Result<Option<CredentialRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                r#"
                SELECT id, user_id, provider, created_at, updated_at
                FROM provider_keys WHERE id = ?1
                "#,
                [id],
                credential_record,
            )
            .optional()
            .map_err(storage)?;

        if record.is_some() {
            conn.execute("DELETE FROM provider_keys WHERE id = ?1", [id])
                .map_err(storage)?;
        }
        Ok(record)
    }
}

const HISTORY_COLUMNS: &str = "id, user_id, filename, provider, status, url, created_at";

impl HistoryStore for SqliteStore {
    fn record(&self, entry: &HistoryRecord) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO upload_history (id, user_id, filename, provider, status, url, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.id,
                    entry.user_id,
                    entry.filename,
                    entry.provider.as_str(),
                    entry.status,
                    entry.url,
                    to_millis(entry.created_at),
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM upload_history WHERE user_id = ?1 \
                 ORDER BY created_at DESC, seq DESC LIMIT ?2",
                HISTORY_COLUMNS
            ))
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], history_record)
            .map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM upload_history ORDER BY created_at DESC, seq DESC LIMIT ?1",
                HISTORY_COLUMNS
            ))
            .map_err(storage)?;
        let rows = stmt
            .query_map([limit as i64], history_record)
            .map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }
}
