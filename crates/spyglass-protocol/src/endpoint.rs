//! Connection URLs.
//!
//! Who is connecting, and to which game, is carried in the connection URL
//! rather than in any message:
//!
//! ```text
//! player:    <scheme>://<host>/ws?gameID=<id>&playerID=<id>&sessionID=<id>
//! spectator: <scheme>://<host>/ws/spectate?gameID=<id>&sessionID=<id>
//! ```

use url::Url;

use crate::ProtocolError;

/// Where the game server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `host[:port]`, without scheme or path.
    pub host: String,
    /// Use `wss` instead of `ws`.
    pub secure: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Derives the endpoint from the origin of the page that hosts the
    /// client, e.g. `https://play.example.com`. A secure origin yields a
    /// secure socket.
    pub fn from_origin(origin: &str) -> Self {
        let (secure, rest) = if let Some(rest) = origin.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = origin.strip_prefix("http://") {
            (false, rest)
        } else {
            (false, origin)
        };
        let host = rest.split('/').next().unwrap_or_default();
        Self::new(host, secure)
    }

    fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }
}

/// How this client takes part in the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    Player { player_id: String },
    Spectator,
}

/// Everything needed to address one session on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub endpoint: Endpoint,
    pub game_id: String,
    pub participant: Participant,
    pub session_id: String,
}

impl ConnectParams {
    /// Returns `true` for a spectator session.
    pub fn is_spectator(&self) -> bool {
        matches!(self.participant, Participant::Spectator)
    }

    /// Builds the connection URL. Query values are form-encoded.
    ///
    /// # Errors
    /// `ProtocolError::InvalidEndpoint` if the host does not form a valid
    /// URL (e.g. an out-of-range port).
    pub fn url(&self) -> Result<Url, ProtocolError> {
        let base = format!("{}://{}", self.endpoint.scheme(), self.endpoint.host);
        let mut url = Url::parse(&base).map_err(|source| ProtocolError::InvalidEndpoint {
            endpoint: base.clone(),
            source,
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("gameID", &self.game_id);
            if let Participant::Player { player_id } = &self.participant {
                query.append_pair("playerID", player_id);
            }
            query.append_pair("sessionID", &self.session_id);
        }
        url.set_path(match self.participant {
            Participant::Player { .. } => "/ws",
            Participant::Spectator => "/ws/spectate",
        });
        Ok(url)
    }
}
