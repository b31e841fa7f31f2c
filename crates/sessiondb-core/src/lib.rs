//! # sessiondb-core
//!
//! Core types for sessiondb, a SQLite-backed store for web sessions.
//!
//! This crate provides:
//! - The session object model handed over by session middleware
//! - The expiry policy applied on every write
//! - Configuration loading and validation
//! - Common error types

pub mod config;
pub mod error;
pub mod expiry;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
pub use expiry::{Expiry, ExpiryPolicy, ExpirySource, DEFAULT_TTL};
pub use session::{Cookie, SessionData, SessionRecord};
