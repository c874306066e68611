//! Story expiry predicate.
//!
//! A story is visible for [`crate::constants::STORY_TTL_HOURS`] hours after
//! creation.  The check runs at read time: the cleanup sweep lags behind, so
//! every consumer filters with this predicate before surfacing a story.

use chrono::{DateTime, Duration, Utc};

use crate::constants::story_ttl;

/// Whether an item created at `created_at` has outlived `ttl` as of `now`.
///
/// The boundary instant is inclusive: an item exactly `ttl` old is still
/// active.  A missing creation timestamp never expires.
pub fn is_expired(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match created_at {
        Some(created) => now > created + ttl,
        None => false,
    }
}

/// [`is_expired`] with the standard story TTL.
pub fn story_is_expired(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    is_expired(created_at, now, story_ttl())
}

/// The creation-time cutoff below which an item counts as expired at `now`.
///
/// `is_expired(Some(t), now, ttl)` holds iff `t < cutoff(now, ttl)`, which is
/// the form the batch cleanup query uses.
pub fn cutoff(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now - ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let ttl = Duration::hours(24);

        // One millisecond past the TTL: expired.
        assert!(is_expired(
            Some(now - ttl - Duration::milliseconds(1)),
            now,
            ttl
        ));

        // Exactly the TTL instant: still active.
        assert!(!is_expired(Some(now - ttl), now, ttl));

        // Just created: active.
        assert!(!is_expired(Some(now), now, ttl));
    }

    #[test]
    fn test_missing_created_at_never_expires() {
        let now = Utc::now();
        assert!(!is_expired(None, now, Duration::hours(24)));
    }

    #[test]
    fn test_cutoff_agrees_with_predicate() {
        let now = Utc::now();
        let ttl = Duration::hours(24);
        let cut = cutoff(now, ttl);

        let expired = cut - Duration::seconds(1);
        let active = cut + Duration::seconds(1);

        assert!(expired < cut && is_expired(Some(expired), now, ttl));
        assert!(active > cut && !is_expired(Some(active), now, ttl));
        // The cutoff instant itself is active (strict comparison).
        assert!(!is_expired(Some(cut), now, ttl));
    }

    #[test]
    fn test_story_ttl_default() {
        let now = Utc::now();
        assert!(story_is_expired(Some(now - Duration::hours(25)), now));
        assert!(!story_is_expired(Some(now - Duration::hours(23)), now));
    }
}
