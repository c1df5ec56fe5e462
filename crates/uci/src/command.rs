//! Commands sent from the controller (GUI) to an engine.

use std::fmt;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Tell the engine the next position belongs to a new game.
    UciNewGame,
    /// Set up position. `fen: None` means the standard starting position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
}

impl GoOptions {
    /// Fixed thinking time per move.
    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: Some(ms),
            ..Self::default()
        }
    }
}

impl GuiCommand {
    /// Format the command as a single UCI line (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(fen) => format!("position fen {}", fen),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(n) = opts.nodes {
                    parts.push(format!("nodes {}", n));
                }
                if let Some(t) = opts.movetime {
                    parts.push(format!("movetime {}", t));
                }
                parts.join(" ")
            }
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}
