//! In-process engines for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineError, EngineFactory};
use crate::rules::Game;

/// Fastest mate: both sides follow the same line and black mates on ply 4.
pub const FOOLS_MATE: &[&str] = &["f2f3", "e7e5", "g2g4", "d8h4"];

/// How a scripted engine misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behaviour {
    #[default]
    Normal,
    FailStart,
    /// Sleep before every move.
    Sleep(Duration),
    Panic,
    /// Every move request fails with a protocol error.
    Error,
}

/// Shared counters, observable after the engine was moved into a match.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    started: Arc<AtomicUsize>,
    quits: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Probe {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    /// Highest number of engines running at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn on_start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn on_stop(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Plays `script[ply]` and resigns once the script runs out.
pub struct ScriptedEngine {
    name: String,
    script: Vec<String>,
    behaviour: Behaviour,
    move_delay: Duration,
    probe: Probe,
    running: bool,
}

impl ScriptedEngine {
    pub fn new(name: &str, script: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            script: script.iter().map(|s| s.to_string()).collect(),
            behaviour: Behaviour::Normal,
            move_delay: Duration::ZERO,
            probe: Probe::default(),
            running: false,
        }
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        if self.behaviour == Behaviour::FailStart {
            return Err(EngineError::Start {
                name: self.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.running = true;
        self.probe.on_start();
        Ok(())
    }

    async fn play(
        &mut self,
        game: &Game,
        _budget: Duration,
    ) -> Result<Option<String>, EngineError> {
        if !self.running {
            return Err(EngineError::NotStarted(self.name.clone()));
        }
        if !self.move_delay.is_zero() {
            tokio::time::sleep(self.move_delay).await;
        }
        match self.behaviour {
            Behaviour::Sleep(duration) => tokio::time::sleep(duration).await,
            Behaviour::Panic => panic!("{} crashed", self.name),
            Behaviour::Error => {
                return Err(EngineError::Protocol("scripted protocol error".to_string()))
            }
            Behaviour::Normal | Behaviour::FailStart => {}
        }
        Ok(self.script.get(game.ply()).cloned())
    }

    async fn quit(&mut self) {
        if self.running {
            self.running = false;
            self.probe.on_stop();
        }
        self.probe.quits.fetch_add(1, Ordering::SeqCst);
    }
}

type BehaviourFn = dyn Fn(&str, usize) -> Behaviour + Send + Sync;

/// Hands out scripted engines that share one [`Probe`].
///
/// The behaviour hook sees the engine name and the creation index, so a test
/// can make a single engine in a tournament misbehave.
pub struct ScriptedFactory {
    script: Vec<String>,
    move_delay: Duration,
    probe: Probe,
    created: AtomicUsize,
    behaviour: Box<BehaviourFn>,
}

impl ScriptedFactory {
    pub fn new(script: &[&str]) -> Self {
        Self {
            script: script.iter().map(|s| s.to_string()).collect(),
            move_delay: Duration::ZERO,
            probe: Probe::default(),
            created: AtomicUsize::new(0),
            behaviour: Box::new(|_, _| Behaviour::Normal),
        }
    }

    pub fn with_behaviour(
        mut self,
        behaviour: impl Fn(&str, usize) -> Behaviour + Send + Sync + 'static,
    ) -> Self {
        self.behaviour = Box::new(behaviour);
        self
    }

    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay = delay;
        self
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }

    /// Engines handed out so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self, config: &EngineConfig) -> Box<dyn Engine> {
        let index = self.created.fetch_add(1, Ordering::SeqCst);
        let script: Vec<&str> = self.script.iter().map(String::as_str).collect();
        Box::new(
            ScriptedEngine::new(&config.name, &script)
                .with_behaviour((self.behaviour)(&config.name, index))
                .with_move_delay(self.move_delay)
                .with_probe(self.probe.clone()),
        )
    }
}
