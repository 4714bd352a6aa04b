//! Player identity for Spyglass.
//!
//! Two identifiers travel in every player connection URL:
//!
//! 1. **Player id** — stable across runs. Generated once, then kept in an
//!    [`IdentityStore`] so a returning player gets their seat back.
//! 2. **Session id** — fresh for every session, used by the server to tell
//!    two tabs (or two terminals) of the same player apart.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← asks for a PlayerIdentity before connecting
//!     ↕
//! Identity Layer (this crate)  ← generates and persists identifiers
//!     ↕
//! IdentityStore (below)  ← file, memory, or anything else
//! ```
//!
//! Storage failures never stop a session from starting. The provider logs
//! them and carries on with an identifier that lives only in memory.

mod error;
mod identity;
mod store;

pub use error::IdentityError;
pub use identity::{IdentityProvider, PlayerIdentity, generate_id};
pub use store::{FileIdentityStore, IdentityStore, MemoryIdentityStore};
