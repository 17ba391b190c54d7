//! Background maintenance tasks.
//!
//! Currently a single periodic job: purging expired login sessions so the
//! `sessions` table does not grow without bound.

use anyhow::Result;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::db::Session;
use crate::DbPool;

/// Removes expired sessions
pub struct SessionCleanup {
    db: DbPool,
}

impl SessionCleanup {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Run a single cleanup cycle
    pub async fn run_once(&self) -> Result<u64> {
        let purged = Session::purge_expired(&self.db).await?;
        if purged > 0 {
            tracing::info!(sessions = purged, "Purged expired sessions");
        } else {
            tracing::debug!("No expired sessions to purge");
        }
        Ok(purged)
    }

    /// Run cleanup cycles forever, one every `period`
    pub async fn run(self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::warn!(error = %e, "Session cleanup failed");
            }
        }
    }
}

/// Spawn the background session cleanup task
pub fn spawn_session_cleanup(db: DbPool, interval_secs: u64) {
    tracing::info!(interval_secs = interval_secs, "Starting session cleanup task");

    let cleanup = SessionCleanup::new(db);
    tokio::spawn(cleanup.run(Duration::from_secs(interval_secs)));
}
