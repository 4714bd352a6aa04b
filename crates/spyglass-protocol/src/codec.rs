//! Codec trait and the JSON implementation.
//!
//! The codec is the only place that knows what the wire looks like. The
//! session layer hands it a [`Command`] and gets a string to transmit, or
//! hands it a raw inbound payload and gets a [`GameSnapshot`] back.

use serde_json::Value;

use crate::{ActionMessage, Command, GameSnapshot, ProtocolError};

/// Converts between typed protocol values and wire payloads.
pub trait Codec: Send + Sync + 'static {
    /// Renders `command` as an outbound payload.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode_action(&self, command: &Command) -> Result<String, ProtocolError>;

    /// Parses an inbound payload into a snapshot.
    ///
    /// # Errors
    /// - `ProtocolError::ServerRejected` for an `{"error": ...}` frame
    /// - `ProtocolError::MalformedSnapshot` for anything else that is not a
    ///   snapshot with a game status
    fn decode_snapshot(&self, raw: &str) -> Result<GameSnapshot, ProtocolError>;
}

/// A [`Codec`] for the server's JSON protocol.
///
/// ```rust
/// use spyglass_protocol::{Codec, Command, JsonCodec};
///
/// let codec = JsonCodec;
/// let wire = codec.encode_action(&Command::StartGame).unwrap();
/// assert_eq!(wire, r#"{"Action":"StartGame"}"#);
///
/// let snap = codec
///     .decode_snapshot(r#"{"BaseGame":{"Status":"pending"}}"#)
///     .unwrap();
/// assert!(snap.is_spectator_view());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_action(&self, command: &Command) -> Result<String, ProtocolError> {
        let message = ActionMessage {
            action: command.to_string(),
        };
        serde_json::to_string(&message).map_err(ProtocolError::Encode)
    }

    fn decode_snapshot(&self, raw: &str) -> Result<GameSnapshot, ProtocolError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProtocolError::MalformedSnapshot(e.to_string()))?;

        // The server's rejection frame carries no game at all.
        if value.get("BaseGame").is_none() {
            if let Some(message) = value.get("error").and_then(Value::as_str) {
                return Err(ProtocolError::ServerRejected(message.to_owned()));
            }
        }

        serde_json::from_value(value)
            .map_err(|e| ProtocolError::MalformedSnapshot(e.to_string()))
    }
}
