//! Session storage implementation.
//!
//! Provides the [`SessionStore`] contract consumed by session middleware and
//! its SQLite-backed implementation, [`SqliteSessionStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use sessiondb_core::config::{is_sql_identifier, StoreConfig, DEFAULT_TABLE_NAME};
use sessiondb_core::{ExpiryPolicy, SessionData, SessionRecord, DEFAULT_TTL};

use crate::adapter::{Database, Value};
use crate::cleanup::{spawn_cleanup_task, Reclaimer, DEFAULT_CLEANUP_INTERVAL};
use crate::codec::{JsonCodec, SessionCodec};
use crate::error::{Result, StoreError};

/// Session storage trait for abstraction over storage backends.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session. `Ok(None)` when the id was never written or is gone.
    ///
    /// Rows past their expiry are still returned until reclamation removes
    /// them.
    async fn get(&self, id: &str) -> Result<Option<SessionData>>;

    /// Insert or fully replace a session, recomputing its expiry.
    async fn set(&self, id: &str, session: &SessionData) -> Result<()>;

    /// Delete a session. Deleting an unknown id succeeds.
    async fn destroy(&self, id: &str) -> Result<()>;

    /// Refresh a session's liveness. Same effect as [`SessionStore::set`].
    async fn touch(&self, id: &str, session: &SessionData) -> Result<()>;

    /// Raw row count, including expired rows not yet reclaimed.
    async fn length(&self) -> Result<u64>;

    /// Delete every session.
    async fn clear(&self) -> Result<()>;

    /// Every stored session with its id, ordered by id.
    async fn all(&self) -> Result<Vec<(String, SessionData)>>;

    /// Stop background maintenance. Safe to call repeatedly.
    fn shutdown(&self);
}

/// Construction options for [`SqliteSessionStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Session table; must be a plain SQL identifier.
    pub table_name: String,
    /// Period of the reclamation task.
    pub cleanup_interval: Duration,
    /// Lifetime of sessions whose cookie carries no expiry.
    pub default_ttl: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl StoreOptions {
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.table_name) {
            return Err(StoreError::InvalidOptions(format!(
                "table name '{}' is not a plain SQL identifier",
                self.table_name
            )));
        }
        if self.cleanup_interval.is_zero() {
            return Err(StoreError::InvalidOptions(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            table_name: config.table_name.clone(),
            cleanup_interval: config.cleanup_interval(),
            default_ttl: config.expiry_policy().default_ttl(),
        }
    }
}

/// SQL text for one session table, built once at construction.
#[derive(Debug)]
struct Statements {
    schema: String,
    select_payload: String,
    select_record: String,
    select_records: String,
    select_all: String,
    upsert: String,
    delete: String,
    count: String,
    clear: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            schema: format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    expires_at INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_expires_at ON {table}(expires_at);"
            ),
            select_payload: format!("SELECT payload FROM {table} WHERE id = ?1 LIMIT 1"),
            select_record: format!("SELECT id, payload, expires_at FROM {table} WHERE id = ?1 LIMIT 1"),
            select_records: format!(
                "SELECT id, payload, expires_at FROM {table}
                 ORDER BY expires_at IS NULL, expires_at, id LIMIT ?1"
            ),
            select_all: format!("SELECT id, payload FROM {table} ORDER BY id"),
            upsert: format!(
                "INSERT INTO {table} (id, payload, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, expires_at = excluded.expires_at"
            ),
            delete: format!("DELETE FROM {table} WHERE id = ?1"),
            count: format!("SELECT COUNT(*) FROM {table}"),
            clear: format!("DELETE FROM {table}"),
        }
    }
}

/// SQLite-backed session storage with background reclamation.
///
/// Must be constructed inside a tokio runtime, which hosts the reclamation
/// task. The task stops on [`SessionStore::shutdown`] or when the store is
/// dropped.
pub struct SqliteSessionStore<C: SessionCodec = JsonCodec> {
    db: Database,
    codec: C,
    policy: ExpiryPolicy,
    table_name: String,
    sql: Statements,
    reclaimer: Reclaimer,
    /// Reclamation task; `None` once shut down.
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl SqliteSessionStore<JsonCodec> {
    /// Create a store with JSON payloads.
    ///
    /// Creates the table and its expiry index if needed and starts the
    /// reclamation task.
    pub async fn new(db: Database, options: StoreOptions) -> Result<Self> {
        Self::with_codec(db, options, JsonCodec).await
    }
}

impl<C: SessionCodec> SqliteSessionStore<C> {
    /// Create a store with a custom payload codec.
    pub async fn with_codec(db: Database, options: StoreOptions, codec: C) -> Result<Self> {
        options.validate()?;

        let sql = Statements::new(&options.table_name);
        db.execute_batch(sql.schema.as_str()).await?;
        debug!(table = %options.table_name, location = db.location(), "Session table ready");

        let reclaimer = Reclaimer::new(db.clone(), &options.table_name);
        let handle = spawn_cleanup_task(reclaimer.clone(), options.cleanup_interval);

        Ok(Self {
            db,
            codec,
            policy: ExpiryPolicy::new(options.default_ttl),
            table_name: options.table_name,
            sql,
            reclaimer,
            cleanup: Mutex::new(Some(handle)),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Whether the reclamation task is still scheduled.
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one reclamation pass now, returning the number of rows removed.
    pub async fn prune_expired(&self) -> Result<usize> {
        self.reclaimer.reclaim_now().await
    }

    /// The raw row for `id`, without decoding the payload.
    pub async fn record(&self, id: &str) -> Result<Option<SessionRecord>> {
        self.db
            .query_one(self.sql.select_record.as_str(), vec![text(id)], record_from_row)
            .await
    }

    /// Raw rows, soonest expiry first, rows that never expire last.
    pub async fn records(&self, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        self.db
            .query_many(self.sql.select_records.as_str(), vec![Value::Integer(limit)], record_from_row)
            .await
    }

    async fn write(&self, id: &str, session: &SessionData) -> Result<()> {
        let now = Utc::now();
        let expiry = self.policy.resolve(session, now);
        let payload = self.codec.encode(session)?;

        self.db
            .execute(
                self.sql.upsert.as_str(),
                vec![text(id), Value::Text(payload), Value::Integer(expiry.at_ms)],
            )
            .await?;

        debug!(
            table = %self.table_name,
            expires_at = expiry.at_ms,
            source = ?expiry.source,
            "Session written"
        );
        Ok(())
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        payload: row.get(1)?,
        expires_at: row.get(2)?,
    })
}

#[async_trait]
impl<C: SessionCodec> SessionStore for SqliteSessionStore<C> {
    async fn get(&self, id: &str) -> Result<Option<SessionData>> {
        let payload = self
            .db
            .query_one(self.sql.select_payload.as_str(), vec![text(id)], |row| {
                row.get::<_, String>(0)
            })
            .await?;

        match payload {
            Some(payload) => Ok(Some(self.codec.decode(&payload)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &str, session: &SessionData) -> Result<()> {
        self.write(id, session).await
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.db.execute(self.sql.delete.as_str(), vec![text(id)]).await?;
        Ok(())
    }

    async fn touch(&self, id: &str, session: &SessionData) -> Result<()> {
        self.write(id, session).await
    }

    async fn length(&self) -> Result<u64> {
        let count = self
            .db
            .query_one(self.sql.count.as_str(), vec![], |row| row.get::<_, i64>(0))
            .await?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    async fn clear(&self) -> Result<()> {
        let result = self.db.execute(self.sql.clear.as_str(), vec![]).await?;
        debug!(table = %self.table_name, removed = result.rows_affected, "Sessions cleared");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<(String, SessionData)>> {
        let rows = self
            .db
            .query_many(self.sql.select_all.as_str(), vec![], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .await?;

        rows.into_iter()
            .map(|(id, payload)| Ok((id, self.codec.decode(&payload)?)))
            .collect()
    }

    fn shutdown(&self) {
        if let Some(handle) = self.cleanup.lock().take() {
            handle.abort();
            debug!(table = %self.table_name, "Session cleanup stopped");
        }
    }
}

impl<C: SessionCodec> Drop for SqliteSessionStore<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
