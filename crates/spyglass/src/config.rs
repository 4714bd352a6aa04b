//! Session and client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spyglass_protocol::{ConnectParams, Endpoint, Participant};
use spyglass_timer::TimerConfig;
use tracing::warn;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time between reconnect attempts while the channel is down.
    pub reconnect_interval: Duration,

    /// Upper bound of the random delay added to the first reconnect
    /// attempt after a drop. Zero means none.
    pub reconnect_jitter: Duration,

    /// How long a single connect attempt may take.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: TimerConfig::DEFAULT_INTERVAL,
            reconnect_jitter: Duration::ZERO,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    #[must_use]
    pub fn with_reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Fixes out-of-range values.
    ///
    /// - `reconnect_interval` is raised to [`TimerConfig::MIN_INTERVAL`].
    /// - Jitter below [`TimerConfig::MIN_JITTER`] is dropped.
    /// - A zero `connect_timeout` falls back to the default.
    pub fn validated(mut self) -> Self {
        if self.reconnect_interval < TimerConfig::MIN_INTERVAL {
            warn!(
                interval_ms = self.reconnect_interval.as_millis() as u64,
                "reconnect_interval below minimum — clamping"
            );
            self.reconnect_interval = TimerConfig::MIN_INTERVAL;
        }
        if !self.reconnect_jitter.is_zero() && self.reconnect_jitter < TimerConfig::MIN_JITTER {
            warn!("reconnect_jitter below one microsecond — disabling");
            self.reconnect_jitter = Duration::ZERO;
        }
        if self.connect_timeout.is_zero() {
            warn!("connect_timeout of zero — using default");
            self.connect_timeout = Self::default().connect_timeout;
        }
        self
    }

    pub(crate) fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            interval: self.reconnect_interval,
            jitter: self.reconnect_jitter,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Errors from loading or applying a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required setting is missing or unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for a client process, persisted as JSON.
///
/// Every field has a default, so a partial file (or `{}`) is valid and
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Game server `host[:port]`.
    pub host: String,
    /// Connect with `wss`.
    pub secure: bool,
    /// The game to join.
    pub game_id: Option<String>,
    /// Join read-only, without a player id.
    pub spectate: bool,
    /// Where the player id is kept. `None` uses the platform data directory.
    pub identity_file: Option<PathBuf>,
    pub reconnect_interval_ms: u64,
    pub connect_timeout_ms: u64,
    /// Log filter, e.g. `info` or `spyglass=debug`.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            host: "localhost:8080".to_owned(),
            secure: false,
            game_id: None,
            spectate: false,
            identity_file: None,
            reconnect_interval_ms: session.reconnect_interval.as_millis() as u64,
            connect_timeout_ms: session.connect_timeout.as_millis() as u64,
            log_level: "info".to_owned(),
        }
    }
}

impl ClientConfig {
    /// Reads a config file.
    ///
    /// # Errors
    /// `ConfigError::Read` if the file can't be read, `ConfigError::Parse`
    /// if it isn't valid JSON for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.secure)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_reconnect_interval(Duration::from_millis(self.reconnect_interval_ms))
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .validated()
    }

    /// Builds the connection parameters for `participant`.
    ///
    /// # Errors
    /// `ConfigError::Invalid` if no game id is set or the host is empty.
    pub fn connect_params(
        &self,
        participant: Participant,
        session_id: String,
    ) -> Result<ConnectParams, ConfigError> {
        let game_id = self
            .game_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigError::Invalid("no game id given".into()))?;
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host is empty".into()));
        }
        Ok(ConnectParams {
            endpoint: self.endpoint(),
            game_id: game_id.to_owned(),
            participant,
            session_id,
        })
    }
}
