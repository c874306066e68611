// Realtime channel layer: command/event transport, in-process hub, and the
// presence / typing aggregators that fold channel events into local views.

pub mod channel;
pub mod hub;
pub mod presence;
pub mod typing;

mod error;

pub use channel::{ChannelEvent, HubCommand, SubscriberId};
pub use error::RealtimeError;
pub use hub::{spawn_hub, HubHandle};
pub use presence::{PresenceSession, PresenceView};
pub use typing::{TypingSession, TypingSet};
