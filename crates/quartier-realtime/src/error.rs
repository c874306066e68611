use thiserror::Error;

/// Errors produced by the realtime layer.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// The hub task has stopped and no longer accepts commands.
    #[error("Realtime hub is no longer running")]
    HubClosed,

    /// The hub did not acknowledge a subscription with a join event.
    #[error("Channel handshake failed: no join acknowledgement")]
    Handshake,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RealtimeError>;
