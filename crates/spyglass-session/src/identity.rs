//! Player and session identifiers.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::IdentityStore;

/// The identifiers a player connection carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub player_id: String,
    pub session_id: String,
}

/// Generates a random version 4 UUID, e.g.
/// `3f2504e0-4f89-41d3-9a0c-0305e82c3301`.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Hands out the stable player id and fresh session ids.
///
/// The player id is resolved once per provider: loaded from the store,
/// or generated and saved on first use. Later calls return the cached
/// value without touching the store.
pub struct IdentityProvider<S: IdentityStore> {
    store: S,
    player_id: Option<String>,
}

impl<S: IdentityStore> IdentityProvider<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            player_id: None,
        }
    }

    /// Returns the persisted player id, creating it if the store is empty.
    ///
    /// A store that cannot be read or written is logged and otherwise
    /// ignored. The id generated in that case lasts as long as this
    /// provider.
    pub fn player_id(&mut self) -> &str {
        if self.player_id.is_none() {
            let id = self.resolve_player_id();
            self.player_id = Some(id);
        }
        self.player_id.as_deref().unwrap_or_default()
    }

    /// A new random session id. Never cached.
    pub fn new_session_id(&self) -> String {
        generate_id()
    }

    /// The player id plus a fresh session id.
    pub fn identity(&mut self) -> PlayerIdentity {
        let player_id = self.player_id().to_owned();
        PlayerIdentity {
            player_id,
            session_id: self.new_session_id(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn resolve_player_id(&self) -> String {
        match self.store.load() {
            Ok(Some(id)) if !id.trim().is_empty() => {
                debug!(player_id = %id, "loaded stored player id");
                id
            }
            Ok(_) => {
                let id = generate_id();
                match self.store.save(&id) {
                    Ok(()) => info!(player_id = %id, "generated new player id"),
                    Err(e) => warn!(
                        error = %e,
                        "could not persist player id, it will not survive a restart"
                    ),
                }
                id
            }
            Err(e) => {
                // Never overwrite a store we could not read.
                warn!(error = %e, "could not load player id, using a temporary one");
                generate_id()
            }
        }
    }
}
