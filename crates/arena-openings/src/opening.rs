//! Core opening types.

use serde::{Deserialize, Serialize};

/// Name and ECO code used for games that start from the initial position.
pub const STARTING_POSITION_NAME: &str = "Starting Position";
/// ECO code used for games that start from the initial position.
pub const STARTING_POSITION_ECO: &str = "A00";

/// A named opening line that a match starts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opening {
    /// The name of the opening.
    pub name: String,
    /// The ECO classification code (e.g., "C50").
    pub eco: String,
    /// The moves of the opening line in UCI notation, from the initial position.
    pub moves: Vec<String>,
}

impl Opening {
    /// Creates a new opening with the given name, ECO code, and moves.
    #[must_use]
    pub fn new(name: impl Into<String>, eco: impl Into<String>, moves: &[&str]) -> Self {
        Self {
            name: name.into(),
            eco: eco.into(),
            moves: moves.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    /// The empty opening: play starts from the standard initial position.
    #[must_use]
    pub fn starting_position() -> Self {
        Self::new(STARTING_POSITION_NAME, STARTING_POSITION_ECO, &[])
    }

    /// Returns true if this opening has no moves.
    #[must_use]
    pub fn is_starting_position(&self) -> bool {
        self.moves.is_empty()
    }

    /// Number of half-moves in the opening line.
    #[must_use]
    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }
}
