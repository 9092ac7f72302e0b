//! Error types shared between the watcher and the simulator.
//!
//! The `FeedError` enum unifies I/O, serialization, WebSocket and domain failures
//! so crates can propagate a single error type. Per-message decode problems are
//! not errors at all; see [`crate::protocol::NotAMessage`].
use std::io;

use thiserror::Error;

/// Unified error type shared by the watcher and the simulator.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Error while parsing the watchlist file into `WatchlistEntry` values.
    #[error("Parse watchlist error: {0}")]
    ParseWatchlist(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Handshake, read or write failure on the WebSocket transport.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The remote did not complete the WebSocket handshake in time.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// The remote side closed the stream before the cycle finished.
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Not every requested symbol was quoted before the collection deadline.
    #[error("Timed out after {elapsed_secs}s waiting for quotes: {missing:?}")]
    Timeout {
        /// Seconds spent collecting before giving up.
        elapsed_secs: u64,
        /// Symbols that never received an update.
        missing: Vec<String>,
    },

    /// Collection stopped because a shutdown was requested.
    #[error("Interrupted by shutdown request")]
    Interrupted,

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The notification collaborator could not be reached or built.
    #[error("Notification error: {0}")]
    Notification(String),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),
}

impl FeedError {
    /// Returns `true` when the error came from a shutdown request rather than a failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, FeedError::Interrupted)
    }
}
