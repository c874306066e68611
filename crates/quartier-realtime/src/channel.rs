//! Channel command / event types.
//!
//! The hub runs in its own tokio task; everything else talks to it through
//! these typed messages over mpsc channels.  The same command surface can be
//! served by a remote bridge instead of the in-process hub, which keeps the
//! aggregators transport-agnostic.

use tokio::sync::mpsc;
use uuid::Uuid;

use quartier_shared::constants::CHANNEL_QUEUE_DEPTH;
use quartier_shared::protocol::PresenceMeta;
use quartier_shared::types::{ChannelName, UserId};

use crate::error::{RealtimeError, Result};
use crate::hub::HubHandle;

/// Identifies one subscription to one channel.  A client that joins two
/// channels holds two subscriber ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands sent *into* the hub task.
#[derive(Debug)]
pub enum HubCommand {
    /// Register a subscriber on a channel.  The hub replies with
    /// [`ChannelEvent::Joined`] followed by an initial membership sync.
    Subscribe {
        channel: ChannelName,
        subscriber: SubscriberId,
        events: mpsc::Sender<ChannelEvent>,
    },

    /// Announce (or refresh) a subject's presence on a channel.
    Track {
        channel: ChannelName,
        meta: PresenceMeta,
    },

    /// Withdraw a subject's presence from a channel.
    Untrack {
        channel: ChannelName,
        user_id: UserId,
    },

    /// Fan a payload out to every other subscriber on the channel.
    Broadcast {
        channel: ChannelName,
        sender: SubscriberId,
        payload: Vec<u8>,
    },

    /// Drop a subscription.  Leaves any tracked presence untouched; a
    /// well-behaved client untracks first.
    Leave {
        channel: ChannelName,
        subscriber: SubscriberId,
    },
}

/// Events sent *from* the hub to a subscriber.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Subscription acknowledged.  Always the first event a subscriber sees.
    Joined,

    /// Full membership snapshot.  Replaces the receiver's entire local view.
    Sync { members: Vec<PresenceMeta> },

    /// A broadcast payload from another subscriber.
    Broadcast { payload: Vec<u8> },
}

/// An established subscription: the event stream plus the ids needed to
/// address the channel afterwards.
pub(crate) struct Subscription {
    pub channel: ChannelName,
    pub subscriber: SubscriberId,
    pub events: mpsc::Receiver<ChannelEvent>,
}

/// Subscribe to `channel` and wait for the hub's join acknowledgement.
pub(crate) async fn subscribe(hub: &HubHandle, channel: &ChannelName) -> Result<Subscription> {
    let subscriber = SubscriberId::new();
    let (tx, mut rx) = mpsc::channel(CHANNEL_QUEUE_DEPTH);

    hub.send(HubCommand::Subscribe {
        channel: channel.clone(),
        subscriber,
        events: tx,
    })
    .await?;

    match rx.recv().await {
        Some(ChannelEvent::Joined) => Ok(Subscription {
            channel: channel.clone(),
            subscriber,
            events: rx,
        }),
        Some(_) => Err(RealtimeError::Handshake),
        None => Err(RealtimeError::HubClosed),
    }
}
