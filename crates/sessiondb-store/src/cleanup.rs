//! Background reclamation of expired sessions.
//!
//! Periodically deletes rows whose `expires_at` lies in the past.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapter::{Database, Value};
use crate::error::Result;

/// Default reclamation interval.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes

/// Deletes expired rows from one session table.
#[derive(Debug, Clone)]
pub struct Reclaimer {
    db: Database,
    table_name: Arc<str>,
    delete_expired: Arc<str>,
}

impl Reclaimer {
    /// `table_name` must already be validated as a plain identifier.
    pub(crate) fn new(db: Database, table_name: &str) -> Self {
        Self {
            db,
            table_name: table_name.into(),
            delete_expired: format!(
                "DELETE FROM {table_name} WHERE expires_at IS NOT NULL AND expires_at < ?1"
            )
            .into(),
        }
    }

    /// Delete every row that expired strictly before `now_ms`.
    pub async fn reclaim(&self, now_ms: i64) -> Result<usize> {
        let result = self
            .db
            .execute(&*self.delete_expired, vec![Value::Integer(now_ms)])
            .await?;
        Ok(result.rows_affected)
    }

    /// One reclamation pass against the current time.
    pub async fn reclaim_now(&self) -> Result<usize> {
        self.reclaim(Utc::now().timestamp_millis()).await
    }
}

/// Spawn a task that runs a reclamation pass every `period`.
///
/// The task lives on the tokio runtime and does not keep the process alive
/// on its own. Failed passes are logged and the schedule continues. Abort the
/// returned handle to stop it.
pub fn spawn_cleanup_task(reclaimer: Reclaimer, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match reclaimer.reclaim_now().await {
                Ok(count) if count > 0 => {
                    info!(
                        table = %reclaimer.table_name,
                        reclaimed = count,
                        "Expired sessions reclaimed"
                    );
                }
                Ok(_) => {
                    debug!(table = %reclaimer.table_name, "Session cleanup: nothing expired");
                }
                Err(e) => {
                    warn!(
                        table = %reclaimer.table_name,
                        error = %e,
                        "Session cleanup failed"
                    );
                }
            }
        }
    })
}
