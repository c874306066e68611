//! CRUD operations for [`Story`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use quartier_shared::constants::story_ttl;
use quartier_shared::expiry::cutoff;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Story;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new story.
    pub fn insert_story(&self, story: &Story) -> Result<()> {
        self.conn().execute(
            "INSERT INTO stories (id, author_id, media_url, caption, duration_ms, is_highlighted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                story.id.to_string(),
                story.author_id.to_string(),
                story.media_url,
                story.caption,
                story.duration_ms,
                story.is_highlighted,
                story.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single story by UUID, whether or not it has expired.
    pub fn get_story(&self, id: Uuid) -> Result<Story> {
        self.conn()
            .query_row(
                "SELECT id, author_id, media_url, caption, duration_ms, is_highlighted, created_at
                 FROM stories WHERE id = ?1",
                params![id.to_string()],
                row_to_story,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List the stories that are still active as of `now`, newest first.
    ///
    /// The SQL range filter does the bulk of the work; the in-code
    /// [`Story::is_active`] pass re-checks each row so a lagging cleanup
    /// sweep or clock skew can never surface an expired story.
    pub fn list_active_stories(&self, now: DateTime<Utc>) -> Result<Vec<Story>> {
        let cut = cutoff(now, story_ttl());

        let mut stmt = self.conn().prepare(
            "SELECT id, author_id, media_url, caption, duration_ms, is_highlighted, created_at
             FROM stories
             WHERE is_highlighted = 1 OR created_at >= ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![cut.to_rfc3339()], row_to_story)?;

        let mut stories = Vec::new();
        for row in rows {
            let story = row?;
            if story.is_active(now) {
                stories.push(story);
            }
        }
        Ok(stories)
    }

    /// List a single author's active stories, oldest first (display order).
    pub fn list_active_stories_for_author(
        &self,
        author_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>> {
        let cut = cutoff(now, story_ttl());

        let mut stmt = self.conn().prepare(
            "SELECT id, author_id, media_url, caption, duration_ms, is_highlighted, created_at
             FROM stories
             WHERE author_id = ?1 AND (is_highlighted = 1 OR created_at >= ?2)
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(
            params![author_id.to_string(), cut.to_rfc3339()],
            row_to_story,
        )?;

        let mut stories = Vec::new();
        for row in rows {
            let story = row?;
            if story.is_active(now) {
                stories.push(story);
            }
        }
        Ok(stories)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Promote a story to a permanent highlight (or demote it again).
    /// Returns `true` if a row was updated.
    pub fn set_story_highlighted(&self, id: Uuid, highlighted: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE stories SET is_highlighted = ?2 WHERE id = ?1",
            params![id.to_string(), highlighted],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a story by UUID.  Returns `true` if a row was deleted.
    pub fn delete_story(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM stories WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// Batch-delete expired, non-highlighted stories created before `cut`.
    /// Returns the number of rows removed.
    pub fn delete_expired_stories(&self, cut: DateTime<Utc>) -> Result<u64> {
        let affected = self.conn().execute(
            "DELETE FROM stories WHERE is_highlighted = 0 AND created_at < ?1",
            params![cut.to_rfc3339()],
        )?;
        Ok(affected as u64)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Story`].
fn row_to_story(row: &rusqlite::Row<'_>) -> rusqlite::Result<Story> {
    let id_str: String = row.get(0)?;
    let author_str: String = row.get(1)?;
    let media_url: String = row.get(2)?;
    let caption: Option<String> = row.get(3)?;
    let duration_ms: i64 = row.get(4)?;
    let is_highlighted: bool = row.get(5)?;
    let created_str: String = row.get(6)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let author_id = Uuid::parse_str(&author_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Story {
        id,
        author_id,
        media_url,
        caption,
        duration_ms,
        is_highlighted,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quartier_shared::constants::DEFAULT_STORY_DURATION_MS;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        Database::open_at(&dir.path().join("test.db")).unwrap()
    }

    fn story_created_at(created_at: DateTime<Utc>) -> Story {
        Story {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            media_url: "https://media.example/photo.jpg".into(),
            caption: Some("market day".into()),
            duration_ms: DEFAULT_STORY_DURATION_MS,
            is_highlighted: false,
            created_at,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let story = story_created_at(Utc::now());
        db.insert_story(&story).unwrap();

        let fetched = db.get_story(story.id).unwrap();
        assert_eq!(fetched, story);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        assert!(matches!(
            db.get_story(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_active_listing_excludes_expired() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();

        let fresh = story_created_at(now - Duration::hours(1));
        let expired = story_created_at(now - Duration::hours(25));
        db.insert_story(&fresh).unwrap();
        db.insert_story(&expired).unwrap();

        let active = db.list_active_stories(now).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, fresh.id);
    }

    #[test]
    fn test_active_listing_includes_expired_highlight() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();

        let mut old = story_created_at(now - Duration::days(10));
        old.is_highlighted = true;
        db.insert_story(&old).unwrap();

        let active = db.list_active_stories(now).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, old.id);
    }

    #[test]
    fn test_author_listing_is_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let now = Utc::now();
        let author = Uuid::new_v4();

        let mut first = story_created_at(now - Duration::hours(3));
        let mut second = story_created_at(now - Duration::hours(1));
        first.author_id = author;
        second.author_id = author;
        db.insert_story(&second).unwrap();
        db.insert_story(&first).unwrap();

        let stories = db.list_active_stories_for_author(author, now).unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].id, first.id);
        assert_eq!(stories[1].id, second.id);
    }

    #[test]
    fn test_highlight_promotion() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let story = story_created_at(Utc::now());
        db.insert_story(&story).unwrap();

        assert!(db.set_story_highlighted(story.id, true).unwrap());
        assert!(db.get_story(story.id).unwrap().is_highlighted);

        // Updating a missing row reports false, not an error.
        assert!(!db.set_story_highlighted(Uuid::new_v4(), true).unwrap());
    }

    #[test]
    fn test_delete_story() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let story = story_created_at(Utc::now());
        db.insert_story(&story).unwrap();

        assert!(db.delete_story(story.id).unwrap());
        assert!(!db.delete_story(story.id).unwrap());
    }
}
