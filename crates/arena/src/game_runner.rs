//! Game execution: drives one match between two engines to a result.
//!
//! A [`GameRunner`] owns both engine handles for the duration of the match.
//! It starts them, sets up the opening, asks the side to move for a move under
//! a per-move deadline, and stops at the first terminal condition. Both engines
//! are shut down on every exit path.

use std::fmt;
use std::time::{Duration, Instant};

use arena_openings::Opening;
use cozy_chess::Color;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::clock::{TimeControl, MOVE_GRACE};
use crate::engine::Engine;
use crate::events::TournamentEvent;
use crate::pgn;
use crate::rules::{Game, Terminal};

/// The outcome of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "1-0")]
    WhiteWins,
    #[serde(rename = "0-1")]
    BlackWins,
    #[serde(rename = "1/2-1/2")]
    Draw,
    /// The match could not be played to a result.
    #[serde(rename = "*")]
    Aborted,
}

impl Outcome {
    /// Result string as used in PGN.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::WhiteWins => "1-0",
            Outcome::BlackWins => "0-1",
            Outcome::Draw => "1/2-1/2",
            Outcome::Aborted => "*",
        }
    }

    /// A decisive outcome in favour of `color`.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }

    pub fn winner_color(self) -> Option<Color> {
        match self {
            Outcome::WhiteWins => Some(Color::White),
            Outcome::BlackWins => Some(Color::Black),
            Outcome::Draw | Outcome::Aborted => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    /// Fifty-move rule or threefold repetition.
    #[serde(rename = "draw")]
    ClaimableDraw,
    Timeout,
    Resignation,
    Error,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient_material",
            Termination::ClaimableDraw => "draw",
            Termination::Timeout => "timeout",
            Termination::Resignation => "resignation",
            Termination::Error => "error",
        }
    }
}

impl From<Terminal> for Termination {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Checkmate => Termination::Checkmate,
            Terminal::Stalemate => Termination::Stalemate,
            Terminal::InsufficientMaterial => Termination::InsufficientMaterial,
            Terminal::FiftyMoves | Terminal::ThreefoldRepetition => Termination::ClaimableDraw,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match state machine.
///
/// `Init -> InProgress -> {Complete, Timeout, Resigned, Error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchState {
    Init,
    InProgress,
    Complete(Terminal),
    /// The side to move missed its deadline.
    Timeout,
    /// The side to move had no move to offer.
    Resigned,
    Error(String),
}

impl MatchState {
    pub fn is_final(&self) -> bool {
        !matches!(self, MatchState::Init | MatchState::InProgress)
    }
}

/// A finished match. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchResult {
    pub match_id: u32,
    pub white: String,
    pub black: String,
    pub outcome: Outcome,
    pub termination: Termination,
    /// Moves played by the engines in UCI notation, opening moves excluded.
    pub moves: Vec<String>,
    pub opening_name: String,
    pub opening_eco: String,
    pub pgn: String,
    pub move_count: usize,
    pub duration_seconds: f64,
    /// Present only for aborted matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchResult {
    /// A match that produced no result, e.g. because the match task failed.
    pub fn aborted(
        match_id: u32,
        white: &str,
        black: &str,
        opening: &Opening,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let header = pgn::PgnHeader {
            round: match_id + 1,
            white,
            black,
            outcome: Outcome::Aborted,
            termination: Termination::Error,
            opening,
        };
        let game = Game::from_opening(opening).unwrap_or_default();
        Self {
            match_id,
            white: white.to_string(),
            black: black.to_string(),
            outcome: Outcome::Aborted,
            termination: Termination::Error,
            moves: Vec::new(),
            opening_name: opening.name.clone(),
            opening_eco: opening.eco.clone(),
            pgn: pgn::to_pgn(&header, &game),
            move_count: 0,
            duration_seconds: duration.as_secs_f64(),
            error: Some(error.into()),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.outcome == Outcome::Aborted
    }

    pub fn winner_color(&self) -> Option<Color> {
        self.outcome.winner_color()
    }

    /// The participant who played the winning colour.
    pub fn winner(&self) -> Option<&str> {
        self.winner_color().map(|color| match color {
            Color::White => self.white.as_str(),
            Color::Black => self.black.as_str(),
        })
    }
}

/// Plays one match between two engines.
///
/// # Example
///
/// ```ignore
/// let runner = GameRunner::new(0, white, black, opening, TimeControl::default());
/// let result = runner.play().await;
/// println!("{} ({})", result.outcome, result.termination);
/// ```
pub struct GameRunner {
    match_id: u32,
    white: Box<dyn Engine>,
    black: Box<dyn Engine>,
    opening: Opening,
    time_control: TimeControl,
    grace: Duration,
    events: Option<broadcast::Sender<TournamentEvent>>,
}

impl GameRunner {
    pub fn new(
        match_id: u32,
        white: Box<dyn Engine>,
        black: Box<dyn Engine>,
        opening: Opening,
        time_control: TimeControl,
    ) -> Self {
        Self {
            match_id,
            white,
            black,
            opening,
            time_control,
            grace: MOVE_GRACE,
            events: None,
        }
    }

    /// Extra time past the budget before a move is forfeited.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Publish a `MoveApplied` event for every move.
    pub fn with_events(mut self, events: broadcast::Sender<TournamentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Play the match to completion.
    pub async fn play(mut self) -> MatchResult {
        let span = info_span!("match", id = self.match_id);
        async move {
            let started = Instant::now();
            let (state, game) = self.drive().await;
            self.white.quit().await;
            self.black.quit().await;
            self.finish(state, game, started.elapsed())
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> (MatchState, Option<Game>) {
        let mut state = MatchState::Init;
        debug!(?state, white = self.white.name(), black = self.black.name());

        if let Err(e) = self.white.start().await {
            return (MatchState::Error(e.to_string()), None);
        }
        if let Err(e) = self.black.start().await {
            return (MatchState::Error(e.to_string()), None);
        }

        let mut game = match Game::from_opening(&self.opening) {
            Ok(game) => game,
            Err(e) => {
                let msg = format!("Invalid opening {}: {}", self.opening.eco, e);
                return (MatchState::Error(msg), None);
            }
        };

        state = MatchState::InProgress;
        debug!(?state, opening = %self.opening.name);

        let tc = self.time_control;
        let mut clocks = [tc.base_seconds; 2];

        loop {
            if let Some(terminal) = game.terminal() {
                return (MatchState::Complete(terminal), Some(game));
            }

            let mover = game.side_to_move();
            let budget = tc.budget(clocks[mover as usize]);
            let budget_duration = tc.budget_duration(clocks[mover as usize]);
            let engine = match mover {
                Color::White => &mut self.white,
                Color::Black => &mut self.black,
            };

            let reply = tokio::time::timeout(
                budget_duration.saturating_add(self.grace),
                engine.play(&game, budget_duration),
            )
            .await;

            let mv = match reply {
                Err(_) => {
                    warn!(engine = engine.name(), budget, "Engine missed its deadline");
                    return (MatchState::Timeout, Some(game));
                }
                Ok(Err(e)) => {
                    let msg = format!("{}: {}", engine.name(), e);
                    return (MatchState::Error(msg), Some(game));
                }
                Ok(Ok(None)) => return (MatchState::Resigned, Some(game)),
                Ok(Ok(Some(mv))) => mv,
            };

            if let Err(e) = game.play_uci(&mv) {
                let msg = format!("{} played an illegal move: {}", engine.name(), e);
                return (MatchState::Error(msg), Some(game));
            }
            clocks[mover as usize] = tc.deduct(clocks[mover as usize], budget);

            if let Some(events) = &self.events {
                let uci = game.moves().last().cloned().unwrap_or(mv);
                // No subscribers is fine.
                let _ = events.send(TournamentEvent::MoveApplied {
                    match_id: self.match_id,
                    fen: game.fen(),
                    uci,
                    ply: game.ply(),
                });
            }
        }
    }

    fn finish(self, state: MatchState, game: Option<Game>, elapsed: Duration) -> MatchResult {
        let white = self.white.name().to_string();
        let black = self.black.name().to_string();

        let game = match game {
            Some(game) => game,
            None => {
                let error = match state {
                    MatchState::Error(msg) => msg,
                    other => format!("Match ended in state {:?}", other),
                };
                warn!(%error, "Match aborted");
                return MatchResult::aborted(
                    self.match_id,
                    &white,
                    &black,
                    &self.opening,
                    error,
                    elapsed,
                );
            }
        };

        let loser = game.side_to_move();
        let (outcome, termination, error) = match state {
            MatchState::Complete(Terminal::Checkmate) => {
                (Outcome::win_for(!loser), Termination::Checkmate, None)
            }
            MatchState::Complete(terminal) => (Outcome::Draw, terminal.into(), None),
            MatchState::Timeout => (Outcome::win_for(!loser), Termination::Timeout, None),
            MatchState::Resigned => (Outcome::win_for(!loser), Termination::Resignation, None),
            MatchState::Error(msg) => (Outcome::Aborted, Termination::Error, Some(msg)),
            MatchState::Init | MatchState::InProgress => (
                Outcome::Aborted,
                Termination::Error,
                Some("Match stopped before a result".to_string()),
            ),
        };

        let opening_plies = self.opening.ply_count().min(game.ply());
        let moves = game.moves()[opening_plies..].to_vec();
        let header = pgn::PgnHeader {
            round: self.match_id + 1,
            white: &white,
            black: &black,
            outcome,
            termination,
            opening: &self.opening,
        };
        let pgn = pgn::to_pgn(&header, &game);

        info!(
            %outcome,
            %termination,
            moves = moves.len(),
            seconds = elapsed.as_secs_f64(),
            "Match finished"
        );

        MatchResult {
            match_id: self.match_id,
            white,
            black,
            outcome,
            termination,
            move_count: moves.len(),
            moves,
            opening_name: self.opening.name.clone(),
            opening_eco: self.opening.eco.clone(),
            pgn,
            duration_seconds: elapsed.as_secs_f64(),
            error,
        }
    }
}
