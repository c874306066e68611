//! Scheduled story cleanup.
//!
//! Sweeps expired, non-highlighted story rows out of the database.  The job
//! is stateless between invocations and deleting is a set operation, so an
//! external scheduler may invoke it redundantly without double-counting.
//!
//! Failures never propagate: every outcome, success or not, is reported
//! through [`CleanupOutcome`] so the scheduler can safely re-invoke on the
//! next tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use quartier_shared::constants::story_ttl;
use quartier_shared::expiry::cutoff;

use crate::database::Database;

/// Structured result of one cleanup invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub success: bool,
    pub deleted_count: u64,
    pub error: Option<String>,
}

impl CleanupOutcome {
    pub fn deleted(count: u64) -> Self {
        Self {
            success: true,
            deleted_count: count,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            deleted_count: 0,
            error: Some(message.into()),
        }
    }
}

/// Delete every story older than the TTL as of `now`, unless highlighted.
///
/// Time is injected so tests and the HTTP entry point can pin it; the
/// scheduler passes `Utc::now()`.
pub fn run_story_cleanup(db: &Database, now: DateTime<Utc>) -> CleanupOutcome {
    let cut = cutoff(now, story_ttl());

    match db.delete_expired_stories(cut) {
        Ok(count) => {
            info!(deleted = count, cutoff = %cut, "Story cleanup finished");
            CleanupOutcome::deleted(count)
        }
        Err(e) => {
            warn!(error = %e, "Story cleanup failed");
            CleanupOutcome::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Story;

    use chrono::Duration;
    use uuid::Uuid;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        Database::open_at(&dir.path().join("test.db")).unwrap()
    }

    fn story(created_at: DateTime<Utc>, is_highlighted: bool) -> Story {
        Story {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            media_url: "https://media.example/story.jpg".into(),
            caption: None,
            duration_ms: 5000,
            is_highlighted,
            created_at,
        }
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();

        let fresh = story(now - Duration::hours(1), false);
        let expired = story(now - Duration::hours(25), false);
        db.insert_story(&fresh).unwrap();
        db.insert_story(&expired).unwrap();

        let outcome = run_story_cleanup(&db, now);
        assert!(outcome.success);
        assert_eq!(outcome.deleted_count, 1);

        assert!(db.get_story(fresh.id).is_ok());
        assert!(db.get_story(expired.id).is_err());
    }

    #[test]
    fn test_cleanup_spares_highlights() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();

        let highlight = story(now - Duration::days(30), true);
        db.insert_story(&highlight).unwrap();

        let outcome = run_story_cleanup(&db, now);
        assert!(outcome.success);
        assert_eq!(outcome.deleted_count, 0);
        assert!(db.get_story(highlight.id).is_ok());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();

        db.insert_story(&story(now - Duration::hours(30), false))
            .unwrap();

        let first = run_story_cleanup(&db, now);
        assert_eq!(first.deleted_count, 1);

        // Nothing new expired between calls: the second sweep is a no-op.
        let second = run_story_cleanup(&db, now);
        assert!(second.success);
        assert_eq!(second.deleted_count, 0);
        assert!(second.error.is_none());
    }

    #[test]
    fn test_boundary_story_survives_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();

        // Exactly TTL old: not expired, must survive the sweep.
        let boundary = story(now - story_ttl(), false);
        db.insert_story(&boundary).unwrap();

        let outcome = run_story_cleanup(&db, now);
        assert_eq!(outcome.deleted_count, 0);
        assert!(db.get_story(boundary.id).is_ok());
    }
}
