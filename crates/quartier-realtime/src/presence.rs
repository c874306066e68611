//! Presence tracking for a named channel.
//!
//! Maintains a local view of "who is currently here", driven entirely by
//! membership snapshots pushed by the hub.  The view is best-effort and
//! eventually consistent; it must never feed correctness-critical decisions
//! such as access control.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use quartier_shared::protocol::PresenceMeta;
use quartier_shared::types::{ChannelName, UserId};

use crate::channel::{self, ChannelEvent, HubCommand, SubscriberId};
use crate::hub::HubHandle;

/// Local membership view for one channel.
///
/// Every sync *replaces* the whole map; nothing is merged incrementally, so a
/// stale entry cannot outlive the next snapshot.
#[derive(Debug, Default)]
pub struct PresenceView {
    members: HashMap<UserId, PresenceMeta>,
}

impl PresenceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire view with a snapshot.
    pub fn apply_sync(&mut self, members: Vec<PresenceMeta>) {
        self.members = members.into_iter().map(|m| (m.user_id, m)).collect();
    }

    /// Whether `user_id` appears in the current view.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.members.contains_key(user_id)
    }

    /// When `user_id` last announced presence, if they are in the view.
    pub fn online_since(&self, user_id: &UserId) -> Option<DateTime<Utc>> {
        self.members.get(user_id).map(|m| m.online_at)
    }

    /// All user ids in the current view.
    pub fn online_users(&self) -> Vec<UserId> {
        self.members.keys().copied().collect()
    }

    /// Current channel population.
    pub fn online_count(&self) -> usize {
        self.members.len()
    }

    fn clear(&mut self) {
        self.members.clear();
    }
}

struct ActivePresence {
    hub: HubHandle,
    channel: ChannelName,
    subscriber: SubscriberId,
    user_id: UserId,
    events: mpsc::Receiver<ChannelEvent>,
}

/// One client's presence subscription to one channel.
///
/// Joining announces self-presence once the hub has acknowledged the
/// subscription.  Dropping the session without [`leave`](Self::leave) only
/// closes the event queue; the tracked presence stays visible to others
/// until an explicit untrack arrives.
pub struct PresenceSession {
    view: PresenceView,
    active: Option<ActivePresence>,
}

impl PresenceSession {
    /// Join `channel` as `user`.
    ///
    /// Presence is opt-in: with no user id there is nothing to announce, so
    /// the session comes back inactive (empty view, no-op teardown) rather
    /// than failing.  Transport failures are logged and likewise produce an
    /// inactive session.
    pub async fn join(hub: &HubHandle, channel: ChannelName, user: Option<UserId>) -> Self {
        let Some(user_id) = user else {
            debug!(channel = %channel, "No user id, presence tracking disabled");
            return Self::inactive();
        };

        let subscription = match channel::subscribe(hub, &channel).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Presence subscribe failed");
                return Self::inactive();
            }
        };

        // Subscription acknowledged; announce ourselves.
        let meta = PresenceMeta {
            user_id,
            online_at: Utc::now(),
        };
        if let Err(e) = hub
            .send(HubCommand::Track {
                channel: channel.clone(),
                meta,
            })
            .await
        {
            warn!(channel = %channel, error = %e, "Presence track failed");
            return Self::inactive();
        }

        Self {
            view: PresenceView::new(),
            active: Some(ActivePresence {
                hub: hub.clone(),
                channel: subscription.channel,
                subscriber: subscription.subscriber,
                user_id,
                events: subscription.events,
            }),
        }
    }

    fn inactive() -> Self {
        Self {
            view: PresenceView::new(),
            active: None,
        }
    }

    /// Whether the session holds a live subscription.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Receive the next channel event, folding membership syncs into the
    /// local view.  Returns `None` once the session is inactive or the hub
    /// has gone away.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        let active = self.active.as_mut()?;
        let event = active.events.recv().await?;

        if let ChannelEvent::Sync { members } = &event {
            self.view.apply_sync(members.clone());
        }

        Some(event)
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.view.is_online(user_id)
    }

    pub fn online_users(&self) -> Vec<UserId> {
        self.view.online_users()
    }

    pub fn online_count(&self) -> usize {
        self.view.online_count()
    }

    /// Tear down the subscription: untrack self-presence, then unsubscribe.
    ///
    /// The order is a correctness requirement.  Unsubscribing does not
    /// untrack, so leaving first would freeze our entry into every other
    /// subscriber's view.  Calling `leave` on an inactive session is a no-op.
    pub async fn leave(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        if let Err(e) = active
            .hub
            .send(HubCommand::Untrack {
                channel: active.channel.clone(),
                user_id: active.user_id,
            })
            .await
        {
            warn!(channel = %active.channel, error = %e, "Presence untrack failed");
        }

        if let Err(e) = active
            .hub
            .send(HubCommand::Leave {
                channel: active.channel.clone(),
                subscriber: active.subscriber,
            })
            .await
        {
            warn!(channel = %active.channel, error = %e, "Channel leave failed");
        }

        self.view.clear();
    }
}
