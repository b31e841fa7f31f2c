//! CLI command implementations.

pub mod config;
pub mod doctor;
pub mod session;

use sessiondb_store::{Database, SqliteSessionStore, StoreOptions};

use crate::AppContext;

/// Open the configured database and session table.
///
/// A connection failure is returned as `StoreError::Connection`, which
/// `main` turns into a fatal exit.
pub async fn open_store(ctx: &AppContext) -> anyhow::Result<SqliteSessionStore> {
    let db = Database::open_configured(&ctx.config.database)?;
    let store = SqliteSessionStore::new(db, StoreOptions::from(&ctx.config.store)).await?;
    Ok(store)
}
