//! Tournament lifecycle events and inbound control commands.
//!
//! Events go out on a `tokio::sync::broadcast` channel, so any number of
//! consumers (console logger, a future web dashboard) can subscribe
//! independently. Slow subscribers lose the oldest events, never block the
//! tournament.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::broadcast;

use crate::game_runner::{Outcome, Termination};
use crate::stats::TournamentStats;

/// Capacity of the event channel.
pub const EVENT_CAPACITY: usize = 1024;

/// Outbound lifecycle events.
///
/// All events use snake_case tag names for JSON serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TournamentEvent {
    /// A match was admitted and is about to start.
    MatchStarted {
        match_id: u32,
        white: String,
        black: String,
        opening: String,
        eco: String,
    },
    /// A move was played in a running match.
    MoveApplied {
        match_id: u32,
        /// Position after the move.
        fen: String,
        /// The move in UCI notation (e.g., "e2e4").
        uci: String,
        /// Plies played so far, opening included.
        ply: usize,
    },
    /// A match finished and its result was recorded.
    MatchEnded {
        match_id: u32,
        result: Outcome,
        winner: Option<String>,
        termination: Termination,
        moves: usize,
        /// Aggregate statistics including this match.
        stats: Box<TournamentStats>,
    },
    /// Every match was completed or skipped.
    Finished { stats: Box<TournamentStats> },
}

/// Creates a broadcast channel for tournament events.
pub fn create_broadcast() -> broadcast::Sender<TournamentEvent> {
    let (tx, _) = broadcast::channel(EVENT_CAPACITY);
    tx
}

/// Inbound control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    Pause,
    Resume,
    Stop,
    /// Pull the current statistics.
    GetStats,
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pause" => Ok(ControlCommand::Pause),
            "resume" => Ok(ControlCommand::Resume),
            "stop" | "quit" => Ok(ControlCommand::Stop),
            "stats" | "get_stats" => Ok(ControlCommand::GetStats),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}
