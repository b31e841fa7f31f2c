//! # sessiondb-store
//!
//! SQLite persistence for web sessions.
//!
//! This crate provides:
//! - An async storage adapter over one SQLite connection (WAL, busy timeout)
//! - The [`SessionStore`] contract used by session middleware
//! - A SQLite implementation with upsert writes and write-time expiry
//! - Background reclamation of expired rows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sessiondb_core::{config::DatabaseConfig, Cookie, SessionData};
//! use sessiondb_store::{Database, SessionStore, SqliteSessionStore, StoreOptions};
//!
//! let db = Database::open("sessions.db", &DatabaseConfig::default())?;
//! let store = SqliteSessionStore::new(db, StoreOptions::default()).await?;
//!
//! store.set("sid-1", &SessionData::new(Cookie::with_max_age(60_000))).await?;
//! let session = store.get("sid-1").await?;
//!
//! store.shutdown();
//! ```
//!
//! ## Storage Layout
//!
//! One table (default `sessions`) with columns `id TEXT PRIMARY KEY`,
//! `payload TEXT NOT NULL` and `expires_at INTEGER` (epoch milliseconds,
//! indexed). Expired rows stay readable until the reclamation task, running
//! every five minutes by default, deletes them.

pub mod adapter;
pub mod cleanup;
pub mod codec;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use adapter::{Database, ExecuteResult, Value};
pub use cleanup::{spawn_cleanup_task, Reclaimer, DEFAULT_CLEANUP_INTERVAL};
pub use codec::{CodecError, JsonCodec, SessionCodec};
pub use error::{Result, StoreError};
pub use store::{SessionStore, SqliteSessionStore, StoreOptions};
