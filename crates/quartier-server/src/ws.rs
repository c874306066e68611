//! WebSocket bridge between remote clients and the realtime hub.
//!
//! Frames are binary bincode ([`ClientFrame`] in, [`ServerFrame`] out).  The
//! bridge is a plain channel client on the remote user's behalf: it forwards
//! their frames as hub commands and streams hub events back.  When the
//! socket dies it performs the client's teardown for them (untrack first,
//! then leave), so a dropped connection does not freeze their presence into
//! everyone else's view.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use quartier_realtime::{ChannelEvent, HubCommand, HubHandle, SubscriberId};
use quartier_shared::constants::CHANNEL_QUEUE_DEPTH;
use quartier_shared::protocol::{ClientFrame, ServerFrame};
use quartier_shared::types::{ChannelName, UserId};

use crate::api::AppState;

pub async fn channel_ws(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let channel = ChannelName::new(name);
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone(), channel))
}

async fn handle_socket(mut socket: WebSocket, hub: HubHandle, channel: ChannelName) {
    let subscriber = SubscriberId::new();
    let (tx, mut events) = mpsc::channel(CHANNEL_QUEUE_DEPTH);

    if hub
        .send(HubCommand::Subscribe {
            channel: channel.clone(),
            subscriber,
            events: tx,
        })
        .await
        .is_err()
    {
        warn!(channel = %channel, "Hub unavailable, closing socket");
        return;
    }

    debug!(channel = %channel, subscriber = %subscriber.0, "WebSocket joined channel");

    // The user this socket has tracked as present, if any.
    let mut tracked: Option<UserId> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!(channel = %channel, "Hub closed event stream");
                    break;
                };

                let frame = match event {
                    ChannelEvent::Joined => ServerFrame::Joined,
                    ChannelEvent::Sync { members } => ServerFrame::Sync { members },
                    ChannelEvent::Broadcast { payload } => ServerFrame::Broadcast { payload },
                };

                let bytes = match frame.to_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode server frame");
                        continue;
                    }
                };

                if socket.send(Message::Binary(bytes)).await.is_err() {
                    break;
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        match ClientFrame::from_bytes(&data) {
                            Ok(ClientFrame::Track { meta }) => {
                                tracked = Some(meta.user_id);
                                if hub.send(HubCommand::Track {
                                    channel: channel.clone(),
                                    meta,
                                }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(ClientFrame::Untrack { user_id }) => {
                                if tracked == Some(user_id) {
                                    tracked = None;
                                }
                                if hub.send(HubCommand::Untrack {
                                    channel: channel.clone(),
                                    user_id,
                                }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(ClientFrame::Broadcast { payload }) => {
                                if hub.send(HubCommand::Broadcast {
                                    channel: channel.clone(),
                                    sender: subscriber,
                                    payload,
                                }).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(channel = %channel, error = %e, "Undecodable client frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // text/ping/pong: nothing to do
                    Some(Err(e)) => {
                        debug!(channel = %channel, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    // Teardown on the client's behalf: untrack, then leave, in that order.
    if let Some(user_id) = tracked {
        let _ = hub
            .send(HubCommand::Untrack {
                channel: channel.clone(),
                user_id,
            })
            .await;
    }
    let _ = hub
        .send(HubCommand::Leave {
            channel: channel.clone(),
            subscriber,
        })
        .await;

    debug!(channel = %channel, subscriber = %subscriber.0, "WebSocket left channel");
}
