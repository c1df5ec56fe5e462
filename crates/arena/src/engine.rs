//! The engine seam: anything that can pick a move for a position.
//!
//! Matches own their engines exclusively. A fresh pair is created for every
//! match through an [`EngineFactory`] and torn down when the match ends.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::rules::Game;
use crate::uci_client::UciEngine;

/// Errors raised by an engine handle.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be launched or failed its handshake.
    #[error("Failed to start engine {name}: {reason}")]
    Start { name: String, reason: String },
    /// `play` was called before `start` or after `quit`.
    #[error("Engine {0} is not running")]
    NotStarted(String),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The engine closed its output stream.
    #[error("Engine {0} closed its output")]
    Closed(String),
    #[error("Engine protocol error: {0}")]
    Protocol(String),
}

/// A move-producing collaborator.
#[async_trait]
pub trait Engine: Send {
    /// Identity used in results and logs.
    fn name(&self) -> &str;

    /// Launch the engine and bring it to a ready state.
    async fn start(&mut self) -> Result<(), EngineError>;

    /// Choose a move for the position of `game` within `budget`.
    ///
    /// `Ok(None)` means the engine has no move to offer and resigns.
    async fn play(&mut self, game: &Game, budget: Duration)
        -> Result<Option<String>, EngineError>;

    /// Shut the engine down. Safe to call more than once.
    async fn quit(&mut self);
}

/// Creates engine handles from their configuration.
pub trait EngineFactory: Send + Sync {
    fn create(&self, config: &EngineConfig) -> Box<dyn Engine>;
}

/// Factory for UCI engines running as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UciEngineFactory;

impl EngineFactory for UciEngineFactory {
    fn create(&self, config: &EngineConfig) -> Box<dyn Engine> {
        Box::new(UciEngine::new(config.clone()))
    }
}
