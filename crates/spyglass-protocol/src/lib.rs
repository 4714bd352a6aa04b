//! Wire protocol for Spyglass.
//!
//! This crate defines the "language" the client and the game server speak:
//!
//! - **Types** ([`GameSnapshot`], [`BaseGame`], [`Card`], [`Role`], ...) —
//!   the full game state the server pushes after every change.
//! - **Commands** ([`Command`], [`ActionMessage`]) — the intents a client
//!   sends back.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those values are
//!   converted to and from wire payloads.
//! - **Endpoints** ([`ConnectParams`]) — how a session is addressed in the
//!   connection URL.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw text frames) and the
//! session reconciler. It knows nothing about connections.
//!
//! ```text
//! Transport (text) → Protocol (GameSnapshot / Command) → Reconciler
//! ```

mod codec;
mod command;
mod endpoint;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use command::{ActionMessage, Command};
pub use endpoint::{ConnectParams, Endpoint, Participant};
pub use error::ProtocolError;
pub use types::{
    BaseGame, Card, CardOwner, GameSnapshot, GameStatus, Role, Team, Turn,
};
