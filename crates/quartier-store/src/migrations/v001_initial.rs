//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `stories` and `listings`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Stories (ephemeral content, 24h TTL unless highlighted)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS stories (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    author_id      TEXT NOT NULL,              -- UUID of the posting user
    media_url      TEXT NOT NULL,              -- externally hosted image/video
    caption        TEXT,
    duration_ms    INTEGER NOT NULL,           -- intended display duration
    is_highlighted INTEGER NOT NULL DEFAULT 0, -- boolean 0/1, exempts from TTL
    created_at     TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_stories_created_at ON stories(created_at);
CREATE INDEX IF NOT EXISTS idx_stories_author ON stories(author_id);

-- ----------------------------------------------------------------
-- Listings (geo-located marketplace entries)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS listings (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    title      TEXT NOT NULL,
    category   TEXT NOT NULL,                  -- event | space | service
    lat        REAL NOT NULL,                  -- decimal degrees
    lon        REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_category ON listings(category);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
