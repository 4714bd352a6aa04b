//! Error types for the Spyglass client.

use spyglass_protocol::ProtocolError;
use spyglass_session::IdentityError;
use spyglass_transport::TransportError;

use crate::ReconcilerState;
use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// A running session never returns these: faults inside it become
/// observable state instead. They show up in setup code (loading config,
/// resolving identity) where `?` is convenient.
#[derive(Debug, thiserror::Error)]
pub enum SpyglassError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad command).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Player id storage failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Bad or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A dispatch was refused.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Why a dispatched command was not sent.
///
/// [`Reconciler::dispatch`](crate::Reconciler::dispatch) logs these and
/// returns `false`; nothing is queued for later.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The session is not `Synced`.
    #[error("session is {0}, not synced")]
    NotLive(ReconcilerState),

    /// The command string is not in the action vocabulary.
    #[error(transparent)]
    Invalid(#[from] ProtocolError),

    /// The current game state makes the command pointless.
    #[error("refused: {0}")]
    Refused(String),
}
