// Failure taxonomy for the acquisition pipeline
//
// Nothing here is fatal. Transport errors move the controller back to
// Connecting; everything else discards one sample and leaves state alone.

use crate::messages::ConnectionState;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server returned status {status}")]
    Status { status: u16 },

    #[error("Connection closed")]
    Closed,

    #[error("Malformed sample: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected {expected} rates, got {got}")]
    ChannelCount { expected: usize, got: usize },

    #[error("Non-finite rate on channel {channel}")]
    NonFinite { channel: usize },

    #[error("Sample received while {state:?}")]
    NotConnected { state: ConnectionState },
}

impl FeedError {
    /// True when the transport itself failed and a reconnect is due
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FeedError::Transport(_) | FeedError::Status { .. } | FeedError::Closed
        )
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
