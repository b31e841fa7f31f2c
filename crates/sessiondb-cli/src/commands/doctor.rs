//! Diagnostic command to check the database and configuration.

use chrono::Utc;

use sessiondb_core::Config;
use sessiondb_store::SessionStore;

use super::open_store;
use crate::AppContext;

pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    let config_file = Config::config_dir().join("config.toml");
    println!("Config file: {:?}", config_file);
    if config_file.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (defaults are used)");
    }

    let result = ctx.config.validate();
    for warning in result.warnings() {
        println!("  ! {}: {}", warning.field, warning.message);
    }

    let db_path = ctx.config.database.resolved_path();
    println!("\nDatabase: {:?}", db_path);
    if db_path.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (will be created on first use)");
    }

    let store = open_store(ctx).await?;
    let db = store.database();

    println!("\nConnection:");
    for pragma in ["journal_mode", "synchronous", "foreign_keys", "busy_timeout"] {
        let value = db.pragma(pragma).await?.unwrap_or_else(|| "?".to_string());
        println!("  {:<13} {}", pragma, value);
    }

    println!("\nTable '{}':", store.table_name());
    let total = store.length().await?;
    let now_ms = Utc::now().timestamp_millis();
    let expired = store
        .records(None)
        .await?
        .iter()
        .filter(|r| r.is_expired_at(now_ms))
        .count();
    println!("  {} sessions, {} awaiting reclamation", total, expired);
    println!(
        "  reclamation every {}s",
        ctx.config.store.cleanup_interval().as_secs_f64()
    );

    store.shutdown();
    Ok(())
}
