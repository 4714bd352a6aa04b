//! One-line text summaries of a session view.

use std::fmt::Write as _;

use spyglass::prelude::*;

/// Summarizes `view` for the terminal, e.g.
/// `[synced] ABCD running, red to play, 3/25 guessed | pending: guess CAT`.
pub fn summary(view: &SessionView) -> String {
    let mut line = format!("[{}]", view.state);

    match &view.snapshot {
        None => line.push_str(" waiting for game state"),
        Some(snap) => {
            let game = &snap.base_game;
            let _ = write!(line, " {} {}", game.id, game.status);
            if let Some(team) = game.whose_turn.team() {
                let _ = write!(line, ", {team} to play");
            }
            if !game.cards.is_empty() {
                let guessed = game.cards.values().filter(|c| c.guessed).count();
                let _ = write!(line, ", {guessed}/{} guessed", game.cards.len());
            }
            if !game.last_card_guessed.is_empty() {
                let outcome = if game.last_card_guessed_correctly {
                    "correct"
                } else {
                    "wrong"
                };
                let _ = write!(line, ", last: {} ({outcome})", game.last_card_guessed);
            }
            if snap.is_spectator_view() {
                line.push_str(", spectating");
            } else if snap.your_turn {
                line.push_str(", your turn");
            }
        }
    }

    if !view.pending.is_empty() {
        let pending: Vec<String> = view.pending.iter().map(ToString::to_string).collect();
        let _ = write!(line, " | pending: {}", pending.join(", "));
    }
    if let Some(err) = &view.last_error {
        let _ = write!(line, " | error: {err}");
    }
    line
}
