use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Presence announcement for one subject on a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceMeta {
    /// Who is present.
    pub user_id: UserId,
    /// Timestamp of the last track call.
    pub online_at: DateTime<Utc>,
}

/// Transient typing notification.  Never stored; only folded into the
/// receiver's current typing set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingEvent {
    pub user_id: UserId,
    pub is_typing: bool,
}

impl TypingEvent {
    /// Serialize to binary (bincode) for use as a broadcast payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from a broadcast payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

/// Frames a channel client sends to the realtime hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientFrame {
    /// Announce (or refresh) own presence on the channel.
    Track { meta: PresenceMeta },

    /// Withdraw own presence.  Sent before leaving so the next sync other
    /// subscribers receive no longer lists this subject.
    Untrack { user_id: UserId },

    /// Fire-and-forget payload fanned out to every other subscriber.
    Broadcast { payload: Vec<u8> },
}

/// Frames the realtime hub sends to a channel client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerFrame {
    /// Subscription acknowledged; an initial `Sync` follows.
    Joined,

    /// Full membership snapshot.  Receivers replace their entire local view
    /// with this list; nothing is merged incrementally.
    Sync { members: Vec<PresenceMeta> },

    /// A broadcast payload from another subscriber.
    Broadcast { payload: Vec<u8> },
}

impl ClientFrame {
    /// Serialize to binary (bincode)
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ServerFrame {
    /// Serialize to binary (bincode)
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
