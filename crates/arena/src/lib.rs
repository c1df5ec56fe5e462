//! Engine Arena - head-to-head tournaments between UCI chess engines.
//!
//! This crate schedules a fixed number of matches between two engines, runs
//! them concurrently under a time control, persists every result as soon as
//! it is known and derives statistics (including an Elo estimate) from them.
//!
//! # Modules
//!
//! - [`tournament`] - Concurrent scheduler with pause, resume and stop
//! - [`game_runner`] - Match state machine for a single game
//! - [`engine`] - The engine seam and its factory
//! - [`uci_client`] - UCI engines running as child processes
//! - [`rules`] - Chess rules: legality, terminal positions, SAN
//! - [`clock`] - Time control and per-move budgets
//! - [`stats`] - Aggregated statistics and Elo estimate
//! - [`storage`] - Versioned JSON snapshot and per-match PGN files
//! - [`pgn`] - PGN generation
//! - [`report`] - Text report, JSON and CSV exports
//! - [`events`] - Lifecycle events and control commands
//! - [`config`] - `arena.toml` configuration

pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod game_runner;
pub mod pgn;
pub mod report;
pub mod rules;
pub mod stats;
pub mod storage;
pub mod tournament;
pub mod uci_client;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{Engine, EngineError, EngineFactory, UciEngineFactory};
pub use game_runner::{MatchResult, Outcome, Termination};
pub use stats::TournamentStats;
pub use tournament::{Tournament, TournamentError, TournamentSettings};
