//! # quartier-shared
//!
//! Types and pure logic shared across the Quartier workspace: identifiers,
//! the story expiry predicate, the geodesic distance engine, and the binary
//! wire protocol spoken on realtime channels.
//!
//! Everything in this crate is deterministic and side-effect free.  Functions
//! that depend on "now" take the current time as a parameter instead of
//! reading the clock.

pub mod constants;
pub mod expiry;
pub mod geo;
pub mod protocol;
pub mod types;

pub use expiry::is_expired;
pub use geo::{distance_km, filter_within_radius, format_distance, sort_by_distance, GeoPoint};
pub use types::{ChannelName, UserId};
