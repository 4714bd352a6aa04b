//! Persistence backends for the player identifier.
//!
//! Spyglass doesn't care where the player id lives — a file, a browser's
//! local storage, a keychain. It only needs the [`IdentityStore`] trait.
//! Two implementations ship with the crate: [`FileIdentityStore`] for
//! desktop/terminal clients and [`MemoryIdentityStore`] for tests and
//! throwaway sessions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::IdentityError;

/// Loads and saves the persisted player identifier.
pub trait IdentityStore: Send + Sync + 'static {
    /// Returns the stored identifier, or `None` if nothing is stored yet.
    fn load(&self) -> Result<Option<String>, IdentityError>;

    /// Persists `player_id`, replacing whatever was stored before.
    fn save(&self, player_id: &str) -> Result<(), IdentityError>;
}

/// On-disk shape of the identity file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    player_id: String,
}

/// Stores the player id as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// File name used under the platform data directory.
    pub const FILE_NAME: &'static str = "identity.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/spyglass/identity.json`, or `None` on platforms without
    /// a data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("spyglass").join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> IdentityError {
        IdentityError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let stored: StoredIdentity =
            serde_json::from_str(&contents).map_err(|source| IdentityError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(stored.player_id))
    }

    fn save(&self, player_id: &str) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let stored = StoredIdentity {
            player_id: player_id.to_owned(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|source| {
            IdentityError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

/// Keeps the player id in memory only.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    player_id: Mutex<Option<String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `player_id`.
    pub fn with_player_id(player_id: impl Into<String>) -> Self {
        Self {
            player_id: Mutex::new(Some(player_id.into())),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        Ok(self
            .player_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, player_id: &str) -> Result<(), IdentityError> {
        *self.player_id.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(player_id.to_owned());
        Ok(())
    }
}
