//! # Spyglass
//!
//! Real-time session client for a team word-guessing game.
//!
//! The game server is the only source of truth. It pushes a complete
//! [`GameSnapshot`](spyglass_protocol::GameSnapshot) after every change, and
//! clients answer with short action strings. This crate keeps one such
//! session alive: it connects, reconnects after drops without changing
//! identity, keeps the latest snapshot (even while stale) and tracks which
//! of our own actions the server has yet to reflect.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spyglass::prelude::*;
//!
//! # async fn demo() -> Result<(), SpyglassError> {
//! let mut identity = IdentityProvider::new(MemoryIdentityStore::new());
//! let params = ConnectParams {
//!     endpoint: Endpoint::new("localhost:8080", false),
//!     game_id: "ABCD".into(),
//!     participant: Participant::Player {
//!         player_id: identity.player_id().to_owned(),
//!     },
//!     session_id: identity.new_session_id(),
//! };
//!
//! let session = Session::start(&params, SessionConfig::default())?;
//! let mut views = session.subscribe();
//! let _ = views.wait_for(SessionView::is_live).await;
//! session.dispatch("StartGame").await;
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod guard;
mod markers;
mod reconciler;
mod session;

pub use config::{ClientConfig, ConfigError, SessionConfig};
pub use error::{DispatchError, SpyglassError};
pub use markers::{Marker, MarkerKey, Markers};
pub use reconciler::{Reconciler, ReconcilerState};
pub use session::{Session, SessionHandle, SessionView};

pub mod prelude {
    pub use crate::{
        ClientConfig, MarkerKey, ReconcilerState, Session, SessionConfig, SessionHandle,
        SessionView, SpyglassError,
    };
    pub use spyglass_protocol::{
        Command, ConnectParams, Endpoint, GameSnapshot, GameStatus, Participant, Role, Team, Turn,
    };
    pub use spyglass_session::{FileIdentityStore, IdentityProvider, MemoryIdentityStore};
}
