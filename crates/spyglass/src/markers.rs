//! Optimistic markers.
//!
//! The protocol has no acknowledgements. When the client sends an action it
//! records a [`Marker`] so the UI can show it as in flight (a greyed-out card,
//! a disabled "end turn" button). Every marker carries a completion predicate
//! over snapshots; the first snapshot that satisfies it clears the marker,
//! whether the server applied the action or the game moved on without it.
//!
//! A server that silently ignores an action changes nothing the predicate
//! looks at, so that marker stays until a newer marker with the same key
//! replaces it or some later snapshot moves the game on.

use std::fmt;

use spyglass_protocol::{Command, GameSnapshot, GameStatus, Role, Turn};

/// What a marker is waiting for. At most one marker exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    /// A guess on this card.
    Guess(String),
    EndTurn,
    /// A seat change for this player.
    RoleChange(String),
    StartGame,
    RestartGame,
}

impl MarkerKey {
    /// The key an action is tracked under.
    pub fn for_command(command: &Command) -> Self {
        match command {
            Command::Guess(word) => Self::Guess(word.clone()),
            Command::EndTurn => Self::EndTurn,
            Command::UpdateTeam { player, .. } => Self::RoleChange(player.clone()),
            Command::StartGame => Self::StartGame,
            Command::RestartGame => Self::RestartGame,
        }
    }
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guess(word) => write!(f, "guess {word}"),
            Self::EndTurn => f.write_str("end turn"),
            Self::RoleChange(player) => write!(f, "role change for {player}"),
            Self::StartGame => f.write_str("start game"),
            Self::RestartGame => f.write_str("restart game"),
        }
    }
}

/// The facts of the snapshot a marker was created against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Baseline {
    status: GameStatus,
    turn: Turn,
    seats: Seats,
}

/// Everything that says who sits where.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Seats {
    team_red: Vec<String>,
    team_blue: Vec<String>,
    spies_and_guessers: [String; 4],
}

impl Seats {
    fn of(snapshot: &GameSnapshot) -> Self {
        let game = &snapshot.base_game;
        Self {
            team_red: game.team_red.clone(),
            team_blue: game.team_blue.clone(),
            spies_and_guessers: [
                game.team_red_spy.clone(),
                game.team_blue_spy.clone(),
                game.team_red_guesser.clone(),
                game.team_blue_guesser.clone(),
            ],
        }
    }
}

impl Baseline {
    fn of(snapshot: &GameSnapshot) -> Self {
        Self {
            status: snapshot.status(),
            turn: snapshot.base_game.whose_turn,
            seats: Seats::of(snapshot),
        }
    }
}

/// One action awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    key: MarkerKey,
    command: Command,
    /// `None` when the action was sent before any snapshot arrived; the
    /// first snapshot then settles it.
    baseline: Option<Baseline>,
}

impl Marker {
    /// Records `command` as sent while `snapshot` was current.
    pub fn new(command: Command, snapshot: Option<&GameSnapshot>) -> Self {
        Self {
            key: MarkerKey::for_command(&command),
            command,
            baseline: snapshot.map(Baseline::of),
        }
    }

    pub fn key(&self) -> &MarkerKey {
        &self.key
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Whether `snapshot` settles this marker.
    pub fn is_complete(&self, snapshot: &GameSnapshot) -> bool {
        let Some(base) = &self.baseline else {
            return true;
        };
        let status = snapshot.status();
        match &self.command {
            Command::Guess(word) => {
                let settled = snapshot.card(word).is_none_or(|card| card.guessed);
                settled || status != GameStatus::Running || snapshot.base_game.whose_turn != base.turn
            }
            Command::EndTurn => {
                status != GameStatus::Running || snapshot.base_game.whose_turn != base.turn
            }
            Command::UpdateTeam { player, role } => {
                seated_as(snapshot, player, *role) || Seats::of(snapshot) != base.seats
            }
            Command::StartGame => status != GameStatus::Pending,
            Command::RestartGame => status != base.status,
        }
    }
}

/// Whether `player` visibly holds `role`.
///
/// Guesser seats are hidden in the lobby, where a guesser appears as an
/// observer of the same team.
fn seated_as(snapshot: &GameSnapshot, player: &str, role: Role) -> bool {
    match snapshot.role_of(player) {
        Some(current) if current == role => true,
        Some(Role::RedObserver) if snapshot.status() == GameStatus::Pending => {
            role == Role::RedGuesser
        }
        Some(Role::BlueObserver) if snapshot.status() == GameStatus::Pending => {
            role == Role::BlueGuesser
        }
        _ => false,
    }
}

/// The set of pending markers, one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    entries: Vec<Marker>,
}

impl Markers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `marker`, replacing any marker with the same key.
    pub fn insert(&mut self, marker: Marker) {
        self.entries.retain(|m| m.key != marker.key);
        self.entries.push(marker);
    }

    /// Drops every marker `snapshot` settles. Returns how many were dropped.
    pub fn settle(&mut self, snapshot: &GameSnapshot) -> usize {
        let before = self.entries.len();
        self.entries.retain(|m| !m.is_complete(snapshot));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &MarkerKey) -> bool {
        self.entries.iter().any(|m| &m.key == key)
    }

    /// Whether a guess on `word` is in flight.
    pub fn is_guess_pending(&self, word: &str) -> bool {
        self.entries
            .iter()
            .any(|m| matches!(&m.key, MarkerKey::Guess(w) if w == word))
    }

    pub fn keys(&self) -> impl Iterator<Item = &MarkerKey> {
        self.entries.iter().map(|m| &m.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
