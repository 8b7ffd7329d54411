//! Error types for window manager IPC operations

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to i3/Sway over the IPC socket
#[derive(Debug, Error)]
pub enum IpcError {
    /// The stream ended before a complete frame was read
    #[error("truncated frame: connection closed while reading {section}")]
    Truncated { section: &'static str },

    /// The frame did not start with the `i3-ipc` magic token
    #[error("invalid magic token {found:?}")]
    InvalidMagic { found: [u8; 6] },

    /// The frame was well formed but its payload could not be parsed
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// Stream-level I/O failure
    #[error("I/O error on window manager socket: {0}")]
    Io(#[source] std::io::Error),

    /// The socket path could not be determined
    #[error("socket discovery failed: {0}")]
    Discovery(String),

    /// No connection became available within the bounded wait
    #[error("no connection to the window manager after {waited:?}: {last_error}")]
    Timeout { waited: Duration, last_error: String },

    /// The window manager replied but rejected the request
    #[error("window manager rejected request: {0}")]
    CommandFailed(String),
}

impl IpcError {
    /// Whether the connection that produced this error must be thrown away.
    ///
    /// Decode and rejection errors leave the stream positioned at a frame
    /// boundary, so the connection stays usable.
    pub fn is_connection_fatal(&self) -> bool {
        !matches!(self, IpcError::Decode(_) | IpcError::CommandFailed(_))
    }
}
