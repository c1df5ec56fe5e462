//! PGN (Portable Game Notation) generation for finished matches.
//!
//! The record is derived from the game alone: the opening moves and the engine
//! moves are replayed from the start position and written in SAN.

use arena_openings::Opening;
use chrono::Utc;

use crate::game_runner::{Outcome, Termination};
use crate::rules::Game;

const EVENT: &str = "Engine Arena Match";
const LINE_WIDTH: usize = 80;

/// Tag values for one game.
#[derive(Debug, Clone)]
pub struct PgnHeader<'a> {
    pub round: u32,
    pub white: &'a str,
    pub black: &'a str,
    pub outcome: Outcome,
    pub termination: Termination,
    pub opening: &'a Opening,
}

/// Renders a complete PGN record.
///
/// The Seven Tag Roster is followed by `ECO`, `Opening` and `Termination`, plus
/// `SetUp`/`FEN` when the game did not start from the initial position. Move
/// text is wrapped at 80 columns.
pub fn to_pgn(header: &PgnHeader<'_>, game: &Game) -> String {
    let mut pgn = String::new();
    let mut tag = |name: &str, value: &str| {
        pgn.push_str(&format!("[{} \"{}\"]\n", name, escape(value)));
    };

    tag("Event", EVENT);
    tag("Site", "local");
    tag("Date", &Utc::now().format("%Y.%m.%d").to_string());
    tag("Round", &header.round.to_string());
    tag("White", header.white);
    tag("Black", header.black);
    tag("Result", header.outcome.as_str());
    tag("ECO", &header.opening.eco);
    tag("Opening", &header.opening.name);
    tag("Termination", header.termination.as_str());
    if let Some(fen) = game.start_fen() {
        tag("SetUp", "1");
        tag("FEN", fen);
    }
    pgn.push('\n');

    let tokens = movetext_tokens(game, header.outcome);
    pgn.push_str(&wrap(&tokens, LINE_WIDTH));
    pgn.push('\n');
    pgn
}

fn movetext_tokens(game: &Game, outcome: Outcome) -> Vec<String> {
    let sans = game.san_history();
    // Whoever moved first: the side to move now if an even number of plies
    // were played, the other side otherwise.
    let black_first = (game.ply() % 2 == 0) == (game.side_to_move() == cozy_chess::Color::Black);

    let mut tokens = Vec::with_capacity(sans.len() * 3 / 2 + 1);
    let offset = usize::from(black_first);
    for (i, san) in sans.into_iter().enumerate() {
        let ply = i + offset;
        let number = ply / 2 + 1;
        if ply % 2 == 0 {
            tokens.push(format!("{}.", number));
        } else if i == 0 {
            tokens.push(format!("{}...", number));
        }
        tokens.push(san);
    }
    tokens.push(outcome.as_str().to_string());
    tokens
}

fn wrap(tokens: &[String], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += token.len();
    }
    out
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
