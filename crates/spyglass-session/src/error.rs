//! Error types for the identity layer.

use std::path::PathBuf;

/// Errors raised by an [`IdentityStore`](crate::IdentityStore).
///
/// The [`IdentityProvider`](crate::IdentityProvider) never passes these on:
/// it logs them and falls back to an identifier held in memory.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Reading or writing the backing file failed.
    #[error("identity storage at {path} unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but does not hold a stored identity.
    #[error("identity file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
