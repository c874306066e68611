//! Background maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use quartier_store::{run_story_cleanup, Database};

/// Spawn the periodic story-cleanup sweep.
///
/// The first sweep runs immediately on startup, then every
/// `interval_secs`.  The job reports through its structured outcome and
/// never aborts the task, so a failed sweep just waits for the next tick.
pub fn spawn_cleanup_task(db: Arc<Mutex<Database>>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            let outcome = {
                let db = db.lock().await;
                run_story_cleanup(&db, Utc::now())
            };

            if outcome.success {
                info!(deleted = outcome.deleted_count, "Scheduled story cleanup ran");
            } else {
                warn!(
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Scheduled story cleanup failed"
                );
            }
        }
    });
}
