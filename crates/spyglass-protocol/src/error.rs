//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the problem is in turning bytes into
//! game values (or commands into bytes), not in networking.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound action failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The inbound payload is not valid JSON, or lacks the game status.
    ///
    /// The previous snapshot stays in force when this happens.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// The server answered with an `{"error": ...}` frame instead of a
    /// snapshot, typically right before dropping the connection.
    #[error("server rejected session: {0}")]
    ServerRejected(String),

    /// A command string is outside the action vocabulary.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The server address does not form a valid connection URL.
    #[error("invalid endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },
}
