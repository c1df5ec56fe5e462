//! UCI (Universal Chess Interface) client for engines running as child processes.
//!
//! [`UciEngine`] spawns the configured executable, performs the UCI handshake,
//! forwards configured options and then asks for one move at a time with
//! `position startpos moves ...` followed by `go movetime <ms>`.
//!
//! The child is spawned with `kill_on_drop`, so a match that is cancelled or
//! panics never leaves an engine process behind.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace, warn};
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand};

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineError};
use crate::rules::Game;

/// Upper bound for `uci`/`uciok` plus `isready`/`readyok`.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a process may take to exit after `quit` before it is killed.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

struct Process {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// A UCI engine subprocess.
pub struct UciEngine {
    config: EngineConfig,
    process: Option<Process>,
    /// Name reported by the engine in `id name`.
    id_name: Option<String>,
    /// Most recent search information for the last move.
    last_info: Option<EngineInfo>,
}

impl UciEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            process: None,
            id_name: None,
            last_info: None,
        }
    }

    /// The name the engine reported during the handshake.
    pub fn id_name(&self) -> Option<&str> {
        self.id_name.as_deref()
    }

    pub fn last_info(&self) -> Option<&EngineInfo> {
        self.last_info.as_ref()
    }

    fn process(&mut self) -> Result<&mut Process, EngineError> {
        let name = &self.config.name;
        self.process
            .as_mut()
            .ok_or_else(|| EngineError::NotStarted(name.clone()))
    }

    async fn send(&mut self, command: GuiCommand) -> Result<(), EngineError> {
        trace!(engine = %self.config.name, ">> {}", command);
        let process = self.process()?;
        process
            .stdin
            .write_all(format!("{}\n", command.to_uci()).as_bytes())
            .await?;
        process.stdin.flush().await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<EngineMessage, EngineError> {
        let name = self.config.name.clone();
        let process = self.process()?;
        let line = process
            .lines
            .next_line()
            .await?
            .ok_or_else(|| EngineError::Closed(name.clone()))?;
        trace!(engine = %name, "<< {}", line);
        EngineMessage::parse(&line).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send(GuiCommand::Uci).await?;
        loop {
            match self.read_message().await? {
                EngineMessage::Id {
                    name: Some(name), ..
                } => self.id_name = Some(name),
                EngineMessage::UciOk => break,
                _ => {}
            }
        }

        for (name, value) in self.config.uci_options() {
            self.send(GuiCommand::SetOption { name, value }).await?;
        }

        self.send(GuiCommand::IsReady).await?;
        while self.read_message().await? != EngineMessage::ReadyOk {}

        self.send(GuiCommand::UciNewGame).await?;
        Ok(())
    }

    fn start_error(&self, reason: impl ToString) -> EngineError {
        EngineError::Start {
            name: self.config.name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Engine for UciEngine {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        if self.process.is_some() {
            return Ok(());
        }

        let mut child = Command::new(&self.config.path)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.start_error(e))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(self.start_error("engine pipes unavailable"));
        };
        self.process = Some(Process {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
        });

        match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.handshake()).await {
            Ok(Ok(())) => {
                debug!(
                    engine = %self.config.name,
                    id = self.id_name.as_deref().unwrap_or("?"),
                    "Engine ready"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.quit().await;
                Err(self.start_error(e))
            }
            Err(_) => {
                self.quit().await;
                Err(self.start_error("handshake timed out"))
            }
        }
    }

    async fn play(
        &mut self,
        game: &Game,
        budget: Duration,
    ) -> Result<Option<String>, EngineError> {
        self.process()?;
        self.last_info = None;

        self.send(GuiCommand::Position {
            fen: game.start_fen().map(str::to_string),
            moves: game.moves().to_vec(),
        })
        .await?;
        let movetime = (budget.as_millis() as u64).max(1);
        self.send(GuiCommand::Go(GoOptions::movetime(movetime)))
            .await?;

        loop {
            match self.read_message().await? {
                EngineMessage::Info(info) => self.last_info = Some(info),
                EngineMessage::BestMove { mv, .. } => {
                    if let Some(info) = &self.last_info {
                        debug!(
                            engine = %self.config.name,
                            depth = ?info.depth,
                            score = ?info.score,
                            nodes = ?info.nodes,
                            bestmove = ?mv,
                            "Search finished"
                        );
                    }
                    return Ok(mv);
                }
                _ => {}
            }
        }
    }

    async fn quit(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };
        let _ = process.stdin.write_all(b"quit\n").await;
        let _ = process.stdin.flush().await;
        match tokio::time::timeout(QUIT_TIMEOUT, process.child.wait()).await {
            Ok(Ok(_)) => {}
            _ => {
                warn!(engine = %self.config.name, "Engine did not exit after quit, killing");
                let _ = process.child.kill().await;
            }
        }
    }
}
