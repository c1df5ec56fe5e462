//! Controller-side UCI (Universal Chess Interface) protocol messages.
//!
//! This crate formats the commands a match controller sends to an engine and
//! parses the lines an engine sends back.
//!
//! # Commands sent
//!
//! - `uci` / `isready` - Handshake and synchronization
//! - `setoption name <id> value <x>` - Engine configuration
//! - `ucinewgame` - New game marker
//! - `position startpos [moves <move>...]` - Set position
//! - `go movetime <ms>` - Start search
//! - `quit` - Exit engine
//!
//! # Messages received
//!
//! - `id name <name>`, `uciok`, `readyok`
//! - `info ...` - Search information
//! - `bestmove <move> [ponder <move>]`

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, Score};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Search finished. `mv` is `None` when the engine has no move to play
    /// (`bestmove (none)` or `bestmove 0000`).
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Option declaration or any other line the controller ignores.
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::ParseError`] for a `bestmove` line without a move.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next().unwrap_or("") {
            "uciok" => Ok(EngineMessage::UciOk),
            "readyok" => Ok(EngineMessage::ReadyOk),
            "id" => {
                let field = parts.next();
                let value = parts.collect::<Vec<_>>().join(" ");
                match field {
                    Some("name") => Ok(EngineMessage::Id {
                        name: Some(value),
                        author: None,
                    }),
                    Some("author") => Ok(EngineMessage::Id {
                        name: None,
                        author: Some(value),
                    }),
                    _ => Ok(EngineMessage::Other(line.to_string())),
                }
            }
            "info" => Ok(EngineInfo::parse(line)
                .map(EngineMessage::Info)
                .unwrap_or_else(|| EngineMessage::Other(line.to_string()))),
            "bestmove" => {
                let mv = parts.next().ok_or_else(|| {
                    UciError::ParseError(format!("bestmove without move: '{}'", line))
                })?;
                let ponder = match (parts.next(), parts.next()) {
                    (Some("ponder"), Some(p)) => Some(p.to_string()),
                    _ => None,
                };
                let mv = match mv {
                    "(none)" | "0000" | "none" => None,
                    m => Some(m.to_string()),
                };
                Ok(EngineMessage::BestMove { mv, ponder })
            }
            _ => Ok(EngineMessage::Other(line.to_string())),
        }
    }
}
