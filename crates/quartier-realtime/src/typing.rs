//! Typing indicators for a named channel.
//!
//! Typing state rides the generic broadcast category, not presence: there is
//! no snapshot reconciliation, so a lost "stopped typing" broadcast leaves
//! the sender stuck in every receiver's set until a later event clears it.
//! [`TypingSet::prune_stale`] exists as an opt-in recovery for callers that
//! want one; nothing invokes it automatically.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use quartier_shared::constants::TYPING_STALE_SECS;
use quartier_shared::protocol::TypingEvent;
use quartier_shared::types::{ChannelName, UserId};

use crate::channel::{self, ChannelEvent, HubCommand, SubscriberId};
use crate::hub::HubHandle;

/// The set of users currently typing, as seen locally.
///
/// Entries carry the receipt timestamp so that staleness can be judged
/// without a second clock source.
#[derive(Debug, Default)]
pub struct TypingSet {
    typing: HashMap<UserId, DateTime<Utc>>,
}

impl TypingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one typing event into the set.
    ///
    /// Adds are idempotent (a repeat refreshes the timestamp); removes of an
    /// absent id are a no-op.
    pub fn apply(&mut self, event: TypingEvent, now: DateTime<Utc>) {
        if event.is_typing {
            self.typing.insert(event.user_id, now);
        } else {
            self.typing.remove(&event.user_id);
        }
    }

    pub fn is_typing(&self, user_id: &UserId) -> bool {
        self.typing.contains_key(user_id)
    }

    pub fn typing_users(&self) -> Vec<UserId> {
        self.typing.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.typing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.typing.is_empty()
    }

    /// Drop entries not refreshed within [`TYPING_STALE_SECS`].
    ///
    /// Opt-in self-healing for lost stop events; the broadcast path never
    /// retracts an entry on its own.
    pub fn prune_stale(&mut self, now: DateTime<Utc>) {
        let horizon = now - Duration::seconds(TYPING_STALE_SECS);
        self.typing.retain(|_, seen_at| *seen_at >= horizon);
    }

    fn clear(&mut self) {
        self.typing.clear();
    }
}

struct ActiveTyping {
    hub: HubHandle,
    channel: ChannelName,
    subscriber: SubscriberId,
    user_id: UserId,
    events: mpsc::Receiver<ChannelEvent>,
}

/// One client's typing-indicator subscription to one channel.
pub struct TypingSession {
    set: TypingSet,
    active: Option<ActiveTyping>,
}

impl TypingSession {
    /// Join `channel` as `user`.  As with presence, an absent user id yields
    /// an inactive session: typing broadcasts need an identified subject.
    pub async fn join(hub: &HubHandle, channel: ChannelName, user: Option<UserId>) -> Self {
        let Some(user_id) = user else {
            debug!(channel = %channel, "No user id, typing indicator disabled");
            return Self::inactive();
        };

        let subscription = match channel::subscribe(hub, &channel).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Typing subscribe failed");
                return Self::inactive();
            }
        };

        Self {
            set: TypingSet::new(),
            active: Some(ActiveTyping {
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
            set: TypingSet::new(),
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Broadcast that this user started typing.  Fire-and-forget: failures
    /// are logged, never surfaced.
    pub async fn start_typing(&self) {
        self.send_typing(true).await;
    }

    /// Broadcast that this user stopped typing.
    pub async fn stop_typing(&self) {
        self.send_typing(false).await;
    }

    async fn send_typing(&self, is_typing: bool) {
        let Some(active) = self.active.as_ref() else {
            return;
        };

        let event = TypingEvent {
            user_id: active.user_id,
            is_typing,
        };

        let payload = match event.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode typing event");
                return;
            }
        };

        if let Err(e) = active
            .hub
            .send(HubCommand::Broadcast {
                channel: active.channel.clone(),
                sender: active.subscriber,
                payload,
            })
            .await
        {
            warn!(channel = %active.channel, error = %e, "Typing broadcast failed");
        }
    }

    /// Receive the next typing event from the channel, folding it into the
    /// local set.  Presence syncs on the same channel are skipped; payloads
    /// that fail to decode are logged and skipped.  Returns `None` once the
    /// session is inactive or the hub has gone away.
    pub async fn next_event(&mut self) -> Option<TypingEvent> {
        let active = self.active.as_mut()?;

        loop {
            match active.events.recv().await? {
                ChannelEvent::Broadcast { payload } => match TypingEvent::from_bytes(&payload) {
                    Ok(event) => {
                        self.set.apply(event, Utc::now());
                        return Some(event);
                    }
                    Err(e) => {
                        warn!(
                            channel = %active.channel,
                            error = %e,
                            "Undecodable broadcast payload on typing channel"
                        );
                    }
                },
                ChannelEvent::Joined | ChannelEvent::Sync { .. } => {}
            }
        }
    }

    pub fn is_typing(&self, user_id: &UserId) -> bool {
        self.set.is_typing(user_id)
    }

    pub fn typing_users(&self) -> Vec<UserId> {
        self.set.typing_users()
    }

    /// See [`TypingSet::prune_stale`].
    pub fn prune_stale(&mut self, now: DateTime<Utc>) {
        self.set.prune_stale(now);
    }

    /// Unsubscribe and discard the local set.  Idempotent.  Deliberately
    /// sends no final "stopped typing" broadcast, matching the unmount
    /// behavior this mirrors.
    pub async fn leave(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

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

        self.set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::spawn_hub;

    #[test]
    fn test_duplicate_start_is_idempotent() {
        let mut set = TypingSet::new();
        let user = UserId::new();
        let now = Utc::now();

        set.apply(
            TypingEvent {
                user_id: user,
                is_typing: true,
            },
            now,
        );
        set.apply(
            TypingEvent {
                user_id: user,
                is_typing: true,
            },
            now,
        );

        assert_eq!(set.len(), 1);
        assert!(set.is_typing(&user));
    }

    #[test]
    fn test_stop_for_absent_user_is_noop() {
        let mut set = TypingSet::new();
        let user = UserId::new();

        set.apply(
            TypingEvent {
                user_id: user,
                is_typing: false,
            },
            Utc::now(),
        );

        assert!(set.is_empty());
        assert!(!set.is_typing(&user));
    }

    #[test]
    fn test_prune_stale() {
        let mut set = TypingSet::new();
        let fresh = UserId::new();
        let stale = UserId::new();
        let now = Utc::now();

        set.apply(
            TypingEvent {
                user_id: stale,
                is_typing: true,
            },
            now - Duration::seconds(TYPING_STALE_SECS + 1),
        );
        set.apply(
            TypingEvent {
                user_id: fresh,
                is_typing: true,
            },
            now,
        );

        set.prune_stale(now);

        assert!(set.is_typing(&fresh));
        assert!(!set.is_typing(&stale));
    }

    #[test]
    fn test_lost_stop_leaves_entry_without_prune() {
        let mut set = TypingSet::new();
        let user = UserId::new();
        let long_ago = Utc::now() - Duration::hours(1);

        set.apply(
            TypingEvent {
                user_id: user,
                is_typing: true,
            },
            long_ago,
        );

        // Without pruning, the entry survives indefinitely.
        assert!(set.is_typing(&user));
    }

    #[tokio::test]
    async fn test_typing_flow_between_sessions() {
        let hub = spawn_hub();
        let channel = ChannelName::new("test:typing");
        let alice = UserId::new();
        let bob = UserId::new();

        let a = TypingSession::join(&hub, channel.clone(), Some(alice)).await;
        let mut b = TypingSession::join(&hub, channel.clone(), Some(bob)).await;
        assert!(a.is_active() && b.is_active());

        a.start_typing().await;
        let event = b.next_event().await.expect("hub alive");
        assert_eq!(event.user_id, alice);
        assert!(b.is_typing(&alice));

        a.stop_typing().await;
        let event = b.next_event().await.expect("hub alive");
        assert!(!event.is_typing);
        assert!(!b.is_typing(&alice));
    }

    #[tokio::test]
    async fn test_inactive_session_is_noop() {
        let hub = spawn_hub();
        let mut session = TypingSession::join(&hub, ChannelName::new("test:anon"), None).await;

        assert!(!session.is_active());
        session.start_typing().await;
        session.stop_typing().await;
        assert!(session.next_event().await.is_none());

        session.leave().await;
        session.leave().await;
    }
}
