//! Game snapshot types for Spyglass's inbound wire format.
//!
//! The server pushes one JSON object per state change, shaped like this
//! (PascalCase keys, as the server emits them):
//!
//! ```text
//! {
//!   "You": "alice", "YouOwnGame": true, "YourTurn": false, "GameCanStart": true,
//!   "BaseGame": {
//!     "ID": "ABCD", "Status": "running", "Players": [...],
//!     "TeamRed": [...], "TeamBlue": [...],
//!     "TeamRedSpy": "...", "TeamBlueSpy": "...",
//!     "TeamRedGuesser": "...", "TeamBlueGuesser": "...",
//!     "WhoseTurn": "red",
//!     "Cards": { "CAT": { "BelongsTo": "red", "Guessed": false, "Index": 0 } },
//!     "LastCardGuessed": "...", "LastCardGuessedBy": "...",
//!     "LastCardGuessedCorrectly": false
//!   }
//! }
//! ```
//!
//! Spectators receive the same object with only `BaseGame` filled in.
//! Only `BaseGame.Status` is mandatory; everything else falls back to its
//! default, and JSON `null` (which the server emits for empty lists) is
//! treated the same as a missing field.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ProtocolError;

/// Deserializes `null` as `T::default()`.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Where the game is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Lobby: players are joining and picking roles.
    Pending,
    Running,
    #[serde(rename = "redwon")]
    RedWon,
    #[serde(rename = "bluewon")]
    BlueWon,
    /// A status string this client does not know.
    #[serde(other)]
    Unknown,
}

impl GameStatus {
    /// Returns `true` once a team has won.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::RedWon | Self::BlueWon)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::RedWon => write!(f, "redwon"),
            Self::BlueWon => write!(f, "bluewon"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Whose turn it is. `Over` once the game has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    Red,
    Blue,
    Over,
    /// Empty or unrecognised, e.g. in the lobby.
    #[default]
    #[serde(other)]
    Nobody,
}

impl Turn {
    /// The team whose turn it is, if any.
    pub fn team(self) -> Option<Team> {
        match self {
            Self::Red => Some(Team::Red),
            Self::Blue => Some(Team::Blue),
            Self::Over | Self::Nobody => None,
        }
    }
}

/// Which side a card belongs to.
///
/// Guessers and spectators only see the owner of cards that have already
/// been guessed; every other card arrives as `Unassigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardOwner {
    Red,
    Blue,
    /// The assassin card: guessing it loses the game.
    Black,
    #[default]
    #[serde(other)]
    Unassigned,
}

/// A seat a player can take via `UpdateTeam`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    BlueSpy,
    BlueGuesser,
    RedSpy,
    RedGuesser,
    BlueObserver,
    RedObserver,
}

impl Role {
    /// Every role, in wire-vocabulary order.
    pub const ALL: [Role; 6] = [
        Role::BlueSpy,
        Role::BlueGuesser,
        Role::RedSpy,
        Role::RedGuesser,
        Role::BlueObserver,
        Role::RedObserver,
    ];

    /// The wire spelling of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlueSpy => "bluespy",
            Self::BlueGuesser => "blueguesser",
            Self::RedSpy => "redspy",
            Self::RedGuesser => "redguesser",
            Self::BlueObserver => "blueobs",
            Self::RedObserver => "redobs",
        }
    }

    /// The team this role plays for.
    pub fn team(self) -> Team {
        match self {
            Self::BlueSpy | Self::BlueGuesser | Self::BlueObserver => Team::Blue,
            Self::RedSpy | Self::RedGuesser | Self::RedObserver => Team::Red,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidCommand(format!("unknown role `{s}`")))
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One word on the board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Card {
    #[serde(default)]
    pub belongs_to: CardOwner,
    #[serde(default)]
    pub guessed: bool,
    /// Position on the 5x5 board, row-major.
    #[serde(default)]
    pub index: usize,
}

/// The part of the game every participant, spectators included, can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseGame {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    pub status: GameStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub players: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_red: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_blue: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_red_spy: String,
    #[serde(default, deserialize_with = "nullable")]
    pub team_blue_spy: String,
    #[serde(default, deserialize_with = "nullable")]
    pub team_red_guesser: String,
    #[serde(default, deserialize_with = "nullable")]
    pub team_blue_guesser: String,
    #[serde(default, deserialize_with = "nullable")]
    pub whose_turn: Turn,
    #[serde(default, deserialize_with = "nullable")]
    pub cards: BTreeMap<String, Card>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_card_guessed: String,
    #[serde(default, deserialize_with = "nullable")]
    pub last_card_guessed_by: String,
    #[serde(default)]
    pub last_card_guessed_correctly: bool,
}

/// A complete, replace-in-full view of the game, as sent to one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameSnapshot {
    /// This client's display name. Empty for spectators.
    #[serde(default, deserialize_with = "nullable")]
    pub you: String,
    #[serde(default)]
    pub you_own_game: bool,
    #[serde(default)]
    pub your_turn: bool,
    #[serde(default)]
    pub game_can_start: bool,
    pub base_game: BaseGame,
}

impl GameSnapshot {
    /// Shorthand for `base_game.status`.
    pub fn status(&self) -> GameStatus {
        self.base_game.status
    }

    /// Returns `true` if this snapshot was projected for a spectator.
    pub fn is_spectator_view(&self) -> bool {
        self.you.is_empty()
    }

    /// Looks up a card by its word.
    pub fn card(&self, word: &str) -> Option<&Card> {
        self.base_game.cards.get(word)
    }

    /// Cards in board order.
    pub fn cards_in_order(&self) -> Vec<(&str, &Card)> {
        let mut cards: Vec<_> = self
            .base_game
            .cards
            .iter()
            .map(|(word, card)| (word.as_str(), card))
            .collect();
        cards.sort_by_key(|(_, card)| card.index);
        cards
    }

    /// The role `player` currently holds, as far as this snapshot shows.
    ///
    /// Guesser seats are only revealed once the game is running, so in the
    /// lobby a guesser shows up as an observer of their team.
    pub fn role_of(&self, player: &str) -> Option<Role> {
        if player.is_empty() {
            return None;
        }
        let game = &self.base_game;
        if game.team_red_spy == player {
            Some(Role::RedSpy)
        } else if game.team_blue_spy == player {
            Some(Role::BlueSpy)
        } else if game.team_red_guesser == player {
            Some(Role::RedGuesser)
        } else if game.team_blue_guesser == player {
            Some(Role::BlueGuesser)
        } else if game.team_red.iter().any(|p| p == player) {
            Some(Role::RedObserver)
        } else if game.team_blue.iter().any(|p| p == player) {
            Some(Role::BlueObserver)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_json() -> &'static str {
        r#"{
            "You": "alice",
            "YouOwnGame": true,
            "YourTurn": true,
            "GameCanStart": true,
            "BaseGame": {
                "ID": "ABCD",
                "Status": "running",
                "Players": ["alice", "bob", "carol", "dave"],
                "TeamRed": ["alice", "carol"],
                "TeamBlue": ["bob", "dave"],
                "TeamRedSpy": "carol",
                "TeamBlueSpy": "dave",
                "TeamRedGuesser": "alice",
                "TeamBlueGuesser": "bob",
                "WhoseTurn": "red",
                "Cards": {
                    "CAT": { "BelongsTo": "", "Guessed": false, "Index": 1 },
                    "DOG": { "BelongsTo": "blue", "Guessed": true, "Index": 0 }
                },
                "LastCardGuessed": "DOG",
                "LastCardGuessedBy": "bob",
                "LastCardGuessedCorrectly": true
            }
        }"#
    }

    #[test]
    fn test_snapshot_deserializes_server_shape() {
        let snap: GameSnapshot = serde_json::from_str(running_json()).unwrap();

        assert_eq!(snap.you, "alice");
        assert!(snap.you_own_game);
        assert_eq!(snap.status(), GameStatus::Running);
        assert_eq!(snap.base_game.id, "ABCD");
        assert_eq!(snap.base_game.whose_turn, Turn::Red);
        assert_eq!(snap.card("DOG").unwrap().belongs_to, CardOwner::Blue);
        assert!(snap.card("DOG").unwrap().guessed);
        // Hidden owners arrive as the empty string.
        assert_eq!(snap.card("CAT").unwrap().belongs_to, CardOwner::Unassigned);
    }

    #[test]
    fn test_snapshot_spectator_frame_defaults_player_fields() {
        let json = r#"{ "BaseGame": { "Status": "pending" } }"#;
        let snap: GameSnapshot = serde_json::from_str(json).unwrap();

        assert!(snap.is_spectator_view());
        assert!(!snap.your_turn);
        assert_eq!(snap.status(), GameStatus::Pending);
        assert_eq!(snap.base_game.whose_turn, Turn::Nobody);
        assert!(snap.base_game.cards.is_empty());
    }

    #[test]
    fn test_snapshot_null_lists_become_empty() {
        let json = r#"{
            "You": "alice",
            "BaseGame": { "Status": "pending", "Players": null, "TeamRed": null, "Cards": null }
        }"#;
        let snap: GameSnapshot = serde_json::from_str(json).unwrap();
        assert!(snap.base_game.players.is_empty());
        assert!(snap.base_game.team_red.is_empty());
        assert!(snap.base_game.cards.is_empty());
    }

    #[test]
    fn test_snapshot_missing_status_is_error() {
        let json = r#"{ "BaseGame": { "ID": "ABCD" } }"#;
        let result: Result<GameSnapshot, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_game_status_unknown_string_decodes_as_unknown() {
        let status: GameStatus = serde_json::from_str(r#""abandoned""#).unwrap();
        assert_eq!(status, GameStatus::Unknown);
    }

    #[test]
    fn test_game_status_won_spellings() {
        let red: GameStatus = serde_json::from_str(r#""redwon""#).unwrap();
        let blue: GameStatus = serde_json::from_str(r#""bluewon""#).unwrap();
        assert_eq!(red, GameStatus::RedWon);
        assert_eq!(blue, GameStatus::BlueWon);
        assert!(red.is_finished() && blue.is_finished());
        assert!(!GameStatus::Running.is_finished());
    }

    #[test]
    fn test_turn_over_has_no_team() {
        let turn: Turn = serde_json::from_str(r#""over""#).unwrap();
        assert_eq!(turn, Turn::Over);
        assert_eq!(turn.team(), None);
        assert_eq!(Turn::Blue.team(), Some(Team::Blue));
    }

    #[test]
    fn test_cards_in_order_sorts_by_index() {
        let snap: GameSnapshot = serde_json::from_str(running_json()).unwrap();
        let words: Vec<&str> = snap.cards_in_order().into_iter().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["DOG", "CAT"]);
    }

    #[test]
    fn test_role_of_reads_seats_then_rosters() {
        let snap: GameSnapshot = serde_json::from_str(running_json()).unwrap();
        assert_eq!(snap.role_of("carol"), Some(Role::RedSpy));
        assert_eq!(snap.role_of("dave"), Some(Role::BlueSpy));
        assert_eq!(snap.role_of("alice"), Some(Role::RedGuesser));
        assert_eq!(snap.role_of("bob"), Some(Role::BlueGuesser));
        assert_eq!(snap.role_of("mallory"), None);
        assert_eq!(snap.role_of(""), None);
    }

    #[test]
    fn test_role_parse_and_display() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::BlueObserver.to_string(), "blueobs");
        assert_eq!(Role::RedGuesser.team(), Team::Red);
        assert!("purplespy".parse::<Role>().is_err());
    }
}
