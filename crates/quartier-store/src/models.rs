//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quartier_shared::expiry::story_is_expired;
use quartier_shared::geo::{GeoPoint, Located};

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

/// An ephemeral content item.  Visible for 24 hours after creation, unless
/// promoted to a highlight, which exempts it from the TTL permanently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    /// Unique story identifier.
    pub id: Uuid,
    /// UUID of the posting user.
    pub author_id: Uuid,
    /// Pointer to externally hosted media; not owned by this store.
    pub media_url: String,
    /// Optional caption shown over the media.
    pub caption: Option<String>,
    /// Intended display duration in milliseconds.
    pub duration_ms: i64,
    /// Whether the story has been promoted to a permanent highlight.
    pub is_highlighted: bool,
    /// When the story was posted; immutable once set.
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Whether the story should still be surfaced as of `now`.
    ///
    /// Expiry is judged at read time; a row may outlive its TTL on disk
    /// until the cleanup sweep catches up.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_highlighted || !story_is_expired(Some(self.created_at), now)
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// What kind of experience a listing offers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingCategory {
    Event,
    Space,
    Service,
}

impl ListingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Space => "space",
            Self::Service => "service",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "event" => Some(Self::Event),
            "space" => Some(Self::Space),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

/// A geo-located marketplace entry (an event, a rentable space, or a
/// bookable service).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Unique listing identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// What kind of experience this is.
    pub category: ListingCategory,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
}

impl Located for Listing {
    fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_story(created_at: DateTime<Utc>, is_highlighted: bool) -> Story {
        Story {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            media_url: "https://media.example/clip.mp4".into(),
            caption: None,
            duration_ms: 5000,
            is_highlighted,
            created_at,
        }
    }

    #[test]
    fn test_story_active_within_ttl() {
        let now = Utc::now();
        assert!(sample_story(now - Duration::hours(1), false).is_active(now));
    }

    #[test]
    fn test_story_expired_past_ttl() {
        let now = Utc::now();
        assert!(!sample_story(now - Duration::hours(25), false).is_active(now));
    }

    #[test]
    fn test_highlight_exempts_from_ttl() {
        let now = Utc::now();
        assert!(sample_story(now - Duration::days(30), true).is_active(now));
    }

    #[test]
    fn test_category_round_trip() {
        for cat in [
            ListingCategory::Event,
            ListingCategory::Space,
            ListingCategory::Service,
        ] {
            assert_eq!(ListingCategory::from_str(cat.as_str()), Some(cat));
        }
        assert_eq!(ListingCategory::from_str("banana"), None);
    }
}
