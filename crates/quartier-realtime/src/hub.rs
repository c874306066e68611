//! In-process realtime hub with the tokio mpsc command pattern.
//!
//! The hub owns all channel state (membership maps and subscriber queues) in
//! a single task, so no locking is needed anywhere in the realtime layer.
//! Delivery is best-effort: a subscriber whose queue is full misses that
//! event, and a subscriber whose queue is closed is pruned on the next send.
//!
//! Presence follows snapshot semantics: any membership change rebroadcasts
//! the *full* member list to every subscriber, and receivers replace their
//! local view wholesale.  Stale entries therefore cannot outlive the next
//! sync, and no incremental-merge ordering logic exists to get wrong.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use quartier_shared::protocol::PresenceMeta;
use quartier_shared::types::{ChannelName, UserId};

use crate::channel::{ChannelEvent, HubCommand, SubscriberId};
use crate::error::{RealtimeError, Result};

/// Cloneable handle for sending commands to the hub task.
#[derive(Clone)]
pub struct HubHandle {
    cmd_tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Send a command to the hub.
    pub async fn send(&self, command: HubCommand) -> Result<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| RealtimeError::HubClosed)
    }
}

/// Per-channel state: who is tracked as present, and who is listening.
#[derive(Default)]
struct ChannelState {
    members: HashMap<UserId, PresenceMeta>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<ChannelEvent>>,
}

impl ChannelState {
    fn snapshot(&self) -> Vec<PresenceMeta> {
        self.members.values().cloned().collect()
    }

    /// Push an event to every subscriber, pruning any whose queue is closed.
    fn fan_out(&mut self, event: ChannelEvent, skip: Option<SubscriberId>) {
        let mut dead = Vec::new();

        for (id, tx) in &self.subscribers {
            if Some(*id) == skip {
                continue;
            }
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id.0, "Subscriber queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            self.subscribers.remove(&id);
            debug!(subscriber = %id.0, "Pruned closed subscriber");
        }
    }
}

/// Spawn the hub event loop in a background tokio task.
///
/// The task runs until every [`HubHandle`] has been dropped.
pub fn spawn_hub() -> HubHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<HubCommand>(256);

    tokio::spawn(async move {
        let mut channels: HashMap<ChannelName, ChannelState> = HashMap::new();

        while let Some(command) = cmd_rx.recv().await {
            match command {
                HubCommand::Subscribe {
                    channel,
                    subscriber,
                    events,
                } => {
                    let state = channels.entry(channel.clone()).or_default();

                    // Ack first, then the initial snapshot, so a new
                    // subscriber always sees Joined before any Sync.
                    let snapshot = state.snapshot();
                    let _ = events.try_send(ChannelEvent::Joined);
                    let _ = events.try_send(ChannelEvent::Sync { members: snapshot });

                    state.subscribers.insert(subscriber, events);
                    debug!(
                        channel = %channel,
                        subscriber = %subscriber.0,
                        population = state.subscribers.len(),
                        "Subscriber joined channel"
                    );
                }

                HubCommand::Track { channel, meta } => {
                    let state = channels.entry(channel.clone()).or_default();
                    state.members.insert(meta.user_id, meta);

                    let snapshot = state.snapshot();
                    state.fan_out(ChannelEvent::Sync { members: snapshot }, None);
                    debug!(channel = %channel, members = state.members.len(), "Presence tracked");
                }

                HubCommand::Untrack { channel, user_id } => {
                    if let Some(state) = channels.get_mut(&channel) {
                        state.members.remove(&user_id);

                        let snapshot = state.snapshot();
                        state.fan_out(ChannelEvent::Sync { members: snapshot }, None);
                        debug!(channel = %channel, user = %user_id, "Presence untracked");
                    }
                }

                HubCommand::Broadcast {
                    channel,
                    sender,
                    payload,
                } => {
                    if let Some(state) = channels.get_mut(&channel) {
                        state.fan_out(ChannelEvent::Broadcast { payload }, Some(sender));
                    }
                }

                HubCommand::Leave {
                    channel,
                    subscriber,
                } => {
                    if let Some(state) = channels.get_mut(&channel) {
                        state.subscribers.remove(&subscriber);
                        debug!(
                            channel = %channel,
                            subscriber = %subscriber.0,
                            "Subscriber left channel"
                        );

                        if state.subscribers.is_empty() {
                            channels.remove(&channel);
                            debug!(channel = %channel, "Dropped empty channel");
                        }
                    }
                }
            }
        }

        info!("Hub command channel closed, event loop terminated");
    });

    HubHandle { cmd_tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::subscribe;

    use chrono::Utc;

    fn meta(user_id: UserId) -> PresenceMeta {
        PresenceMeta {
            user_id,
            online_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_acks_then_syncs() {
        let hub = spawn_hub();
        let channel = ChannelName::new("test:ack");

        // subscribe() consumes the Joined ack internally.
        let mut sub = subscribe(&hub, &channel).await.expect("subscribe");

        // Initial snapshot of an empty channel.
        match sub.events.recv().await {
            Some(ChannelEvent::Sync { members }) => assert!(members.is_empty()),
            other => panic!("expected initial sync, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_track_fans_out_snapshot() {
        let hub = spawn_hub();
        let channel = ChannelName::new("test:track");
        let user = UserId::new();

        let mut sub = subscribe(&hub, &channel).await.unwrap();
        let _ = sub.events.recv().await; // initial sync

        hub.send(HubCommand::Track {
            channel: channel.clone(),
            meta: meta(user),
        })
        .await
        .unwrap();

        match sub.events.recv().await {
            Some(ChannelEvent::Sync { members }) => {
                assert_eq!(members.len(), 1);
                assert_eq!(members[0].user_id, user);
            }
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_leave_without_untrack_keeps_member_visible() {
        let hub = spawn_hub();
        let channel = ChannelName::new("test:ghost");
        let user = UserId::new();

        // Subscriber A tracks presence, then leaves without untracking.
        let a = subscribe(&hub, &channel).await.unwrap();
        hub.send(HubCommand::Track {
            channel: channel.clone(),
            meta: meta(user),
        })
        .await
        .unwrap();
        hub.send(HubCommand::Leave {
            channel: channel.clone(),
            subscriber: a.subscriber,
        })
        .await
        .unwrap();

        // Subscriber B still sees the ghost in its initial snapshot.
        let mut b = subscribe(&hub, &channel).await.unwrap();
        match b.events.recv().await {
            Some(ChannelEvent::Sync { members }) => {
                assert_eq!(members.len(), 1);
                assert_eq!(members[0].user_id, user);
            }
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let hub = spawn_hub();
        let channel = ChannelName::new("test:echo");

        let mut a = subscribe(&hub, &channel).await.unwrap();
        let mut b = subscribe(&hub, &channel).await.unwrap();
        let _ = a.events.recv().await;
        let _ = b.events.recv().await;

        hub.send(HubCommand::Broadcast {
            channel: channel.clone(),
            sender: a.subscriber,
            payload: vec![1, 2, 3],
        })
        .await
        .unwrap();

        match b.events.recv().await {
            Some(ChannelEvent::Broadcast { payload }) => assert_eq!(payload, vec![1, 2, 3]),
            other => panic!("expected broadcast, got {other:?}"),
        }

        // The sender receives nothing back.
        assert!(a.events.try_recv().is_err());
    }
}
