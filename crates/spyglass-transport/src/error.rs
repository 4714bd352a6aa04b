/// Errors that can occur in the transport layer.
///
/// None of these are fatal to a session: the channel manager reports every
/// one of them upward only as a transition to
/// [`ConnectionState::Disconnected`](crate::ConnectionState::Disconnected).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer sent a frame that cannot be delivered as text.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
