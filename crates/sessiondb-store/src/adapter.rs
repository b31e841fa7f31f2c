//! Storage adapter over a single SQLite connection.
//!
//! Every operation runs the blocking rusqlite call on tokio's blocking pool
//! and suspends the caller until it finishes. The connection mutex is only
//! held inside that blocking closure, never across an `.await`; concurrent
//! writers are arbitrated by SQLite's busy timeout.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use sessiondb_core::config::DatabaseConfig;

use crate::error::{Result, StoreError};

pub use rusqlite::types::Value;

/// Metadata returned by [`Database::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteResult {
    pub rows_affected: usize,
    pub last_insert_rowid: i64,
}

/// Shared handle to the session database. Cloning is cheap.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Arc<str>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("location", &self.location).finish()
    }
}

impl Database {
    /// Open (or create) the database file and apply connection pragmas.
    pub fn open(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let location = path.display().to_string();
        let conn = Connection::open(path).map_err(|source| StoreError::Connection {
            path: location.clone(),
            source,
        })?;
        Self::configure(conn, location, config)
    }

    /// Open the file named by the configuration.
    pub fn open_configured(config: &DatabaseConfig) -> Result<Self> {
        Self::open(config.resolved_path(), config)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory(config: &DatabaseConfig) -> Result<Self> {
        let location = ":memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Connection {
            path: location.clone(),
            source,
        })?;
        Self::configure(conn, location, config)
    }

    fn configure(conn: Connection, location: String, config: &DatabaseConfig) -> Result<Self> {
        let failed = |source| StoreError::Connection {
            path: location.clone(),
            source,
        };

        conn.busy_timeout(config.busy_timeout()).map_err(failed)?;
        // In-memory databases answer "memory" instead of switching to WAL.
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(failed)?;
        conn.pragma_update(None, "synchronous", config.synchronous.to_ascii_uppercase())
            .map_err(failed)?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)
            .map_err(failed)?;

        debug!(
            location = %location,
            journal_mode = %journal_mode,
            busy_timeout_ms = config.busy_timeout_ms,
            "Opened session database"
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: location.into(),
        })
    }

    /// File path, or `:memory:`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?;
        Ok(result?)
    }

    /// Run a mutating statement.
    pub async fn execute(&self, sql: impl Into<String>, params: Vec<Value>) -> Result<ExecuteResult> {
        let sql = sql.into();
        self.with_conn(move |conn| {
            let rows_affected = conn.execute(&sql, params_from_iter(params.iter()))?;
            Ok(ExecuteResult {
                rows_affected,
                last_insert_rowid: conn.last_insert_rowid(),
            })
        })
        .await
    }

    /// Run one or more parameterless statements, e.g. schema DDL.
    pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<()> {
        let sql = sql.into();
        self.with_conn(move |conn| conn.execute_batch(&sql)).await
    }

    /// Run a statement expected to yield zero or one row.
    pub async fn query_one<T, F>(&self, sql: impl Into<String>, params: Vec<Value>, map: F) -> Result<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sql = sql.into();
        self.with_conn(move |conn| conn.query_row(&sql, params_from_iter(params.iter()), map).optional())
            .await
    }

    /// Run a statement yielding any number of rows, in query order.
    pub async fn query_many<T, F>(&self, sql: impl Into<String>, params: Vec<Value>, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sql = sql.into();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), map)?;
            let collected = rows.collect::<rusqlite::Result<Vec<T>>>();
            collected
        })
        .await
    }

    /// Current value of a pragma, as text.
    pub async fn pragma(&self, name: &'static str) -> Result<Option<String>> {
        self.with_conn(move |conn| {
            conn.pragma_query_value(None, name, |row| row.get::<_, Value>(0))
                .optional()
        })
        .await
        .map(|value| value.map(value_to_text))
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Null => "null".to_string(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
