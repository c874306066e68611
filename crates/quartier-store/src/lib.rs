//! # quartier-store
//!
//! Local persistence for the Quartier marketplace, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model, plus the scheduled story-cleanup job.

pub mod cleanup;
pub mod database;
pub mod listings;
pub mod migrations;
pub mod models;
pub mod stories;

mod error;

pub use cleanup::{run_story_cleanup, CleanupOutcome};
pub use database::Database;
pub use error::StoreError;
pub use models::*;
