use chrono::Duration;

/// Application name
pub const APP_NAME: &str = "Quartier";

/// How long a story stays visible after creation, in hours.
pub const STORY_TTL_HOURS: i64 = 24;

/// Default display duration for a story, in milliseconds.
pub const DEFAULT_STORY_DURATION_MS: i64 = 5000;

/// Mean Earth radius in kilometers, used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// How long a typing-indicator entry may go without a refresh before
/// `TypingSet::prune_stale` considers it dead.  Pruning is opt-in; the
/// broadcast path itself never retracts an entry.
pub const TYPING_STALE_SECS: i64 = 10;

/// Per-subscriber event queue depth on a realtime channel.
pub const CHANNEL_QUEUE_DEPTH: usize = 256;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default interval between scheduled story-cleanup sweeps, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// The story TTL as a [`chrono::Duration`].
pub fn story_ttl() -> Duration {
    Duration::hours(STORY_TTL_HOURS)
}
