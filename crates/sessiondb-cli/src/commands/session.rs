//! Session management commands.

use chrono::{DateTime, Local, Utc};

use sessiondb_core::{SessionData, SessionRecord};
use sessiondb_store::{SessionStore, SqliteSessionStore};

use super::open_store;
use crate::{AppContext, Commands};

/// Format a datetime for display.
fn format_time(dt: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = dt.with_timezone(&Local);
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a raw session row for listing.
fn format_record(record: &SessionRecord, now_ms: i64) -> String {
    let expiry = match record.expires_at_utc() {
        Some(at) => format_time(&at),
        None if record.expires_at.is_some() => "out of range".to_string(),
        None => "never".to_string(),
    };
    let marker = if record.is_expired_at(now_ms) { " [expired]" } else { "" };
    format!("{}  {}{}", record.id, expiry, marker)
}

pub async fn handle(command: Commands, ctx: &AppContext) -> anyhow::Result<()> {
    let store = open_store(ctx).await?;

    let result = match command {
        Commands::Count => {
            println!("{}", store.length().await?);
            Ok(())
        }
        Commands::List { limit } => {
            let records = store.records(Some(limit)).await?;
            if records.is_empty() {
                println!("No sessions stored.");
            }
            let now_ms = Utc::now().timestamp_millis();
            for record in &records {
                println!("{}", format_record(record, now_ms));
            }
            Ok(())
        }
        Commands::Show { id } => show_session(&store, &id).await,
        Commands::Put { json, id } => {
            let session: SessionData = serde_json::from_str(&json)
                .map_err(|e| anyhow::anyhow!("Invalid session JSON: {}", e))?;
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            store.set(&id, &session).await?;
            println!("{}", id);
            Ok(())
        }
        Commands::Delete { id } => {
            store.destroy(&id).await?;
            println!("Deleted {}", id);
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete every session without --yes");
            }
            let before = store.length().await?;
            store.clear().await?;
            println!("Cleared {} sessions", before);
            Ok(())
        }
        Commands::Prune => {
            let removed = store.prune_expired().await?;
            println!("Reclaimed {} expired sessions", removed);
            Ok(())
        }
        Commands::Config { .. } | Commands::Version | Commands::Doctor => {
            anyhow::bail!("not a session command")
        }
    };

    store.shutdown();
    result
}

async fn show_session(store: &SqliteSessionStore, id: &str) -> anyhow::Result<()> {
    let Some(session) = store.get(id).await? else {
        println!("Session not found: {}", id);
        return Ok(());
    };

    println!("{}", serde_json::to_string_pretty(&session)?);
    if let Some(record) = store.record(id).await? {
        let now_ms = Utc::now().timestamp_millis();
        println!("\nExpires: {}", format_record(&record, now_ms));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: Option<i64>) -> SessionRecord {
        SessionRecord {
            id: "abc".to_string(),
            payload: "{}".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_format_never_expiring() {
        assert_eq!(format_record(&record(None), 0), "abc  never");
    }

    #[test]
    fn test_format_marks_expired() {
        let line = format_record(&record(Some(1_000)), 2_000);
        assert!(line.starts_with("abc  "));
        assert!(line.ends_with("[expired]"));
    }

    #[test]
    fn test_format_live_is_unmarked() {
        assert!(!format_record(&record(Some(5_000)), 2_000).contains("expired"));
    }
}
