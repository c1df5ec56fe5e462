//! Concurrent tournament scheduler.
//!
//! One task is spawned per match id. A task waits while the tournament is
//! paused, takes a slot from a semaphore sized to the concurrency bound, plays
//! the match and records the result. Recording is serialised: the result is
//! appended, the snapshot rewritten and the PGN written before the next result
//! is recorded, so a crash loses at most the matches that were in flight.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use arena_openings::{Opening, OpeningBook};
use futures_util::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::clock::{TimeControl, MOVE_GRACE};
use crate::config::{EngineConfig, TournamentConfig};
use crate::engine::EngineFactory;
use crate::events::{self, TournamentEvent};
use crate::game_runner::{GameRunner, MatchResult};
use crate::stats::{analyze, TournamentStats};
use crate::storage::{ResultStore, StorageError};

/// Fatal tournament errors. Failures inside a match never end up here.
#[derive(Error, Debug)]
pub enum TournamentError {
    #[error("Number of games must be at least 1")]
    InvalidMatchCount,
    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("Invalid time control {0}: times must be finite and non-negative")]
    InvalidTimeControl(TimeControl),
    #[error("Both participants are named {0}")]
    IdenticalParticipants(String),
    #[error("Snapshot contains match {match_id} but the tournament has only {games} games")]
    SnapshotOutOfRange { match_id: u32, games: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything needed to run a tournament between two participants.
#[derive(Debug, Clone)]
pub struct TournamentSettings {
    pub participant_a: EngineConfig,
    pub participant_b: EngineConfig,
    pub games: u32,
    pub concurrency: usize,
    pub time_control: TimeControl,
    pub use_opening_book: bool,
    pub output_dir: PathBuf,
    pub results_file: PathBuf,
    /// Extra time past the move budget before a move is forfeited.
    pub move_grace: Duration,
    /// Seed for the opening pairing; random when unset.
    pub seed: Option<u64>,
}

impl TournamentSettings {
    pub fn new(participant_a: EngineConfig, participant_b: EngineConfig) -> Self {
        Self::from_config(&TournamentConfig::default(), participant_a, participant_b)
    }

    /// Settings from the `[tournament]` section of the config file.
    pub fn from_config(
        config: &TournamentConfig,
        participant_a: EngineConfig,
        participant_b: EngineConfig,
    ) -> Self {
        Self {
            participant_a,
            participant_b,
            games: config.games,
            concurrency: config.concurrency,
            time_control: config.time_control,
            use_opening_book: config.use_opening_book,
            output_dir: config.output_dir.clone(),
            results_file: config.results_file.clone(),
            move_grace: MOVE_GRACE,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), TournamentError> {
        if self.games == 0 {
            return Err(TournamentError::InvalidMatchCount);
        }
        if self.concurrency == 0 {
            return Err(TournamentError::InvalidConcurrency);
        }
        if !self.time_control.is_valid() {
            return Err(TournamentError::InvalidTimeControl(self.time_control));
        }
        if self.participant_a.name == self.participant_b.name {
            return Err(TournamentError::IdenticalParticipants(
                self.participant_a.name.clone(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Control {
    running: bool,
    paused: bool,
}

#[derive(Debug, Default)]
struct State {
    results: Vec<MatchResult>,
    completed: HashSet<u32>,
}

struct Inner {
    settings: TournamentSettings,
    factory: Arc<dyn EngineFactory>,
    store: ResultStore,
    book: OpeningBook,
    control: watch::Sender<Control>,
    slots: Semaphore,
    state: Mutex<State>,
    persist: tokio::sync::Mutex<()>,
    events: broadcast::Sender<TournamentEvent>,
}

/// Handle to a tournament. Cheap to clone; all clones control the same run.
#[derive(Clone)]
pub struct Tournament {
    inner: Arc<Inner>,
}

impl Tournament {
    pub fn new(
        settings: TournamentSettings,
        factory: Arc<dyn EngineFactory>,
    ) -> Result<Self, TournamentError> {
        settings.validate()?;
        let store = ResultStore::new(&settings.results_file, &settings.output_dir);
        let (control, _) = watch::channel(Control {
            running: true,
            paused: false,
        });
        let slots = Semaphore::new(settings.concurrency);

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                factory,
                store,
                book: OpeningBook::builtin(),
                control,
                slots,
                state: Mutex::new(State::default()),
                persist: tokio::sync::Mutex::new(()),
                events: events::create_broadcast(),
            }),
        })
    }

    pub fn settings(&self) -> &TournamentSettings {
        &self.inner.settings
    }

    pub fn store(&self) -> &ResultStore {
        &self.inner.store
    }

    /// Play every match that is not in the snapshot yet.
    ///
    /// Returns all results, previously persisted ones included, once every
    /// match has completed or been skipped because of [`Tournament::stop`].
    ///
    /// # Errors
    ///
    /// Fails before any match starts if the snapshot cannot be loaded or
    /// refers to match ids outside this tournament.
    pub async fn run(&self) -> Result<Vec<MatchResult>, TournamentError> {
        let settings = &self.inner.settings;
        let previous = self.inner.store.load()?;
        if let Some(result) = previous.iter().find(|r| r.match_id >= settings.games) {
            return Err(TournamentError::SnapshotOutOfRange {
                match_id: result.match_id,
                games: settings.games,
            });
        }
        if !previous.is_empty() {
            info!(
                completed = previous.len(),
                total = settings.games,
                "Resuming from {}",
                self.inner.store.results_file().display()
            );
        }
        {
            let mut state = self.lock_state();
            state.completed = previous.iter().map(|r| r.match_id).collect();
            state.results = previous;
        }

        let openings = self.assign_openings();
        info!(
            a = %settings.participant_a.name,
            b = %settings.participant_b.name,
            games = settings.games,
            concurrency = settings.concurrency,
            time_control = %settings.time_control,
            "Tournament started"
        );

        let mut tasks = JoinSet::new();
        for (match_id, opening) in (0..settings.games).zip(openings) {
            let tournament = self.clone();
            tasks.spawn(async move { tournament.run_match(match_id, opening).await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Match task failed");
            }
        }

        let stats = self.live_stats();
        info!(
            completed = stats.completed_matches,
            a_wins = stats.a_wins,
            b_wins = stats.b_wins,
            draws = stats.draws,
            "Tournament finished"
        );
        let _ = self.inner.events.send(TournamentEvent::Finished {
            stats: Box::new(stats),
        });
        Ok(self.results())
    }

    /// Stop admitting matches until [`Tournament::resume`].
    pub fn pause(&self) {
        self.inner.control.send_modify(|c| c.paused = true);
        info!("Tournament paused");
    }

    pub fn resume(&self) {
        self.inner.control.send_modify(|c| c.paused = false);
        info!("Tournament resumed");
    }

    /// Skip every match not yet admitted. Running matches play to the end.
    pub fn stop(&self) {
        self.inner.control.send_modify(|c| c.running = false);
        info!("Tournament stopping after running matches");
    }

    pub fn is_paused(&self) -> bool {
        self.inner.control.borrow().paused
    }

    pub fn is_running(&self) -> bool {
        self.inner.control.borrow().running
    }

    /// Statistics over the results recorded so far.
    pub fn live_stats(&self) -> TournamentStats {
        let settings = &self.inner.settings;
        let state = self.lock_state();
        analyze(
            &state.results,
            &settings.participant_a.name,
            &settings.participant_b.name,
        )
    }

    /// Results recorded so far, in completion order.
    pub fn results(&self) -> Vec<MatchResult> {
        self.lock_state().results.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TournamentEvent> {
        self.inner.events.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_complete(&self, match_id: u32) -> bool {
        self.lock_state().completed.contains(&match_id)
    }

    fn assign_openings(&self) -> Vec<Opening> {
        let settings = &self.inner.settings;
        let n = settings.games as usize;
        if !settings.use_opening_book {
            return vec![Opening::starting_position(); n];
        }
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.inner.book.build_pairing(n, &mut rng)
    }

    /// Colours alternate by id: A has white in even matches.
    fn colours(&self, match_id: u32) -> (&EngineConfig, &EngineConfig) {
        let settings = &self.inner.settings;
        if match_id % 2 == 0 {
            (&settings.participant_a, &settings.participant_b)
        } else {
            (&settings.participant_b, &settings.participant_a)
        }
    }

    async fn run_match(&self, match_id: u32, opening: Opening) {
        if self.is_complete(match_id) {
            debug!(match_id, "Already complete, skipping");
            return;
        }

        let mut control = self.inner.control.subscribe();
        let permit = loop {
            let waited = control
                .wait_for(|c| !c.paused || !c.running)
                .await
                .map(|c| *c);
            match waited {
                Ok(c) if c.running => {}
                _ => {
                    debug!(match_id, "Tournament stopped, skipping");
                    return;
                }
            }

            let Ok(permit) = self.inner.slots.acquire().await else {
                return;
            };
            let now = *control.borrow_and_update();
            if !now.running {
                debug!(match_id, "Tournament stopped, skipping");
                return;
            }
            if now.paused {
                drop(permit);
                continue;
            }
            break permit;
        };

        let (white_config, black_config) = self.colours(match_id);
        let (white_name, black_name) = (white_config.name.clone(), black_config.name.clone());
        let white = self.inner.factory.create(white_config);
        let black = self.inner.factory.create(black_config);

        info!(
            match_id,
            white = %white_name,
            black = %black_name,
            opening = %opening.name,
            "Match started"
        );
        let _ = self.inner.events.send(TournamentEvent::MatchStarted {
            match_id,
            white: white_name.clone(),
            black: black_name.clone(),
            opening: opening.name.clone(),
            eco: opening.eco.clone(),
        });

        let runner = GameRunner::new(
            match_id,
            white,
            black,
            opening.clone(),
            self.inner.settings.time_control,
        )
        .with_grace(self.inner.settings.move_grace)
        .with_events(self.inner.events.clone());

        let started = Instant::now();
        let result = match AssertUnwindSafe(runner.play()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                error!(match_id, reason, "Match panicked");
                MatchResult::aborted(
                    match_id,
                    &white_name,
                    &black_name,
                    &opening,
                    format!("Match panicked: {}", reason),
                    started.elapsed(),
                )
            }
        };
        drop(permit);

        self.record(result).await;
    }

    async fn record(&self, result: MatchResult) {
        let _guard = self.inner.persist.lock().await;

        let snapshot = {
            let mut state = self.lock_state();
            if !state.completed.insert(result.match_id) {
                warn!(match_id = result.match_id, "Duplicate result discarded");
                return;
            }
            state.results.push(result.clone());
            state.results.clone()
        };

        if let Err(e) = self.inner.store.save(&snapshot).await {
            error!(error = %e, "Failed to save results, continuing in memory");
        }
        if let Err(e) = self.inner.store.write_pgn(&result).await {
            error!(match_id = result.match_id, error = %e, "Failed to write PGN");
        }

        let stats = self.live_stats();
        info!(
            match_id = result.match_id,
            result = %result.outcome,
            termination = %result.termination,
            moves = result.move_count,
            "Match finished ({}/{})",
            stats.completed_matches,
            self.inner.settings.games
        );
        let _ = self.inner.events.send(TournamentEvent::MatchEnded {
            match_id: result.match_id,
            result: result.outcome,
            winner: result.winner().map(str::to_string),
            termination: result.termination,
            moves: result.move_count,
            stats: Box::new(stats),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_runner::{Outcome, Termination};
    use crate::testing::{Behaviour, ScriptedFactory, FOOLS_MATE};

    fn settings(dir: &tempfile::TempDir, games: u32, concurrency: usize) -> TournamentSettings {
        let out = dir.path().join("out");
        TournamentSettings {
            participant_a: EngineConfig::new("alpha", "alpha"),
            participant_b: EngineConfig::new("beta", "beta"),
            games,
            concurrency,
            time_control: TimeControl::new(10.0, 0.0),
            use_opening_book: false,
            results_file: out.join("results.json"),
            output_dir: out,
            move_grace: Duration::from_secs(1),
            seed: Some(7),
        }
    }

    fn tournament(settings: TournamentSettings, factory: &Arc<ScriptedFactory>) -> Tournament {
        Tournament::new(settings, factory.clone()).unwrap()
    }

    fn sorted_ids(results: &[MatchResult]) -> Vec<u32> {
        let mut ids: Vec<u32> = results.iter().map(|r| r.match_id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_validation() {
        let dir = tempfile::tempdir().unwrap();
        let factory: Arc<dyn EngineFactory> = Arc::new(ScriptedFactory::new(FOOLS_MATE));

        let err = Tournament::new(settings(&dir, 0, 1), factory.clone()).err();
        assert!(matches!(err, Some(TournamentError::InvalidMatchCount)));

        let err = Tournament::new(settings(&dir, 4, 0), factory.clone()).err();
        assert!(matches!(err, Some(TournamentError::InvalidConcurrency)));

        let mut same = settings(&dir, 4, 1);
        same.participant_b.name = "alpha".to_string();
        let err = Tournament::new(same, factory.clone()).err();
        assert!(
            matches!(err, Some(TournamentError::IdenticalParticipants(name)) if name == "alpha")
        );

        assert!(Tournament::new(settings(&dir, 2, 8), factory).is_ok());
    }

    #[test]
    fn test_invalid_time_control_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));

        for tc in [
            TimeControl::new(10.0, -1.0),
            TimeControl::new(-1.0, 0.0),
            TimeControl::new(f64::NAN, 0.0),
            TimeControl::new(10.0, f64::INFINITY),
        ] {
            let mut settings = settings(&dir, 2, 1);
            settings.time_control = tc;
            let err = Tournament::new(settings, factory.clone()).err();
            assert!(matches!(err, Some(TournamentError::InvalidTimeControl(_))), "{tc}");
        }
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_runs_every_match_once() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let t = tournament(settings(&dir, 6, 2), &factory);

        let results = t.run().await.unwrap();

        assert_eq!(sorted_ids(&results), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(factory.created(), 12);
        assert!(results
            .iter()
            .all(|r| r.termination == Termination::Checkmate && r.outcome == Outcome::BlackWins));

        let stored = t.store().load().unwrap();
        assert_eq!(stored.len(), 6);
        for id in 0..6 {
            assert!(t.store().pgn_path(id).exists());
        }
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(
            ScriptedFactory::new(FOOLS_MATE).with_move_delay(Duration::from_millis(10)),
        );
        let t = tournament(settings(&dir, 6, 2), &factory);

        t.run().await.unwrap();

        let probe = factory.probe();
        assert_eq!(probe.started(), 12);
        assert!(probe.max_active() <= 4, "max active {}", probe.max_active());
    }

    #[tokio::test]
    async fn test_single_slot_runs_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(
            ScriptedFactory::new(FOOLS_MATE).with_move_delay(Duration::from_millis(5)),
        );
        let t = tournament(settings(&dir, 3, 1), &factory);

        t.run().await.unwrap();

        assert_eq!(factory.probe().max_active(), 2);
    }

    #[tokio::test]
    async fn test_colours_alternate() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let t = tournament(settings(&dir, 4, 4), &factory);

        let results = t.run().await.unwrap();

        for result in &results {
            let expected = if result.match_id % 2 == 0 { "alpha" } else { "beta" };
            assert_eq!(result.white, expected);
        }
        assert_eq!(results.iter().filter(|r| r.white == "alpha").count(), 2);

        // Black mates every game, so each side wins exactly its black games.
        let stats = t.live_stats();
        assert_eq!(stats.a_wins, 2);
        assert_eq!(stats.b_wins, 2);
        assert!(stats.elo_difference.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resume_skips_completed_matches() {
        let dir = tempfile::tempdir().unwrap();

        let first = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        tournament(settings(&dir, 2, 2), &first).run().await.unwrap();

        let second = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let t = tournament(settings(&dir, 5, 2), &second);
        let results = t.run().await.unwrap();

        assert_eq!(second.created(), 6);
        assert_eq!(sorted_ids(&results), vec![0, 1, 2, 3, 4]);
        assert_eq!(t.store().load().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_snapshot_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        tournament(settings(&dir, 4, 2), &factory).run().await.unwrap();

        let err = tournament(settings(&dir, 2, 2), &factory).run().await.err();
        assert!(matches!(
            err,
            Some(TournamentError::SnapshotOutOfRange { games: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let settings = settings(&dir, 2, 2);
        std::fs::create_dir_all(&settings.output_dir).unwrap();
        std::fs::write(&settings.results_file, "not json").unwrap();

        let err = tournament(settings, &factory).run().await.err();
        assert!(matches!(err, Some(TournamentError::Storage(StorageError::Json(_)))));
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_pause_holds_admissions() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let t = tournament(settings(&dir, 4, 2), &factory);

        t.pause();
        let handle = tokio::spawn({
            let t = t.clone();
            async move { t.run().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(factory.created(), 0);
        assert!(t.results().is_empty());

        t.resume();
        let results = handle.await.unwrap().unwrap();
        assert_eq!(sorted_ids(&results), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_pause_mid_run_lets_running_match_finish() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(
            ScriptedFactory::new(FOOLS_MATE).with_move_delay(Duration::from_millis(20)),
        );
        let t = tournament(settings(&dir, 4, 1), &factory);
        let mut events = t.subscribe();

        let handle = tokio::spawn({
            let t = t.clone();
            async move { t.run().await }
        });
        let running = loop {
            if let TournamentEvent::MatchStarted { match_id, .. } = events.recv().await.unwrap() {
                break match_id;
            }
        };
        t.pause();

        loop {
            match events.recv().await.unwrap() {
                TournamentEvent::MatchEnded { match_id, .. } => {
                    assert_eq!(match_id, running);
                    break;
                }
                TournamentEvent::MatchStarted { match_id, .. } => {
                    panic!("match {match_id} started while paused")
                }
                _ => {}
            }
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(event) = events.try_recv() {
            assert!(
                !matches!(event, TournamentEvent::MatchStarted { .. }),
                "match started while paused"
            );
        }
        assert_eq!(t.results().len(), 1);
        assert_eq!(factory.created(), 2);
        assert!(t.is_paused());

        t.resume();
        let results = handle.await.unwrap().unwrap();
        assert_eq!(sorted_ids(&results), vec![0, 1, 2, 3]);
        assert_eq!(factory.created(), 8);
    }

    #[tokio::test]
    async fn test_stop_while_paused_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let t = tournament(settings(&dir, 4, 2), &factory);

        t.pause();
        let handle = tokio::spawn({
            let t = t.clone();
            async move { t.run().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        t.stop();

        let results = handle.await.unwrap().unwrap();
        assert!(results.is_empty());
        assert_eq!(factory.created(), 0);
        assert!(!t.is_running());
    }

    #[tokio::test]
    async fn test_stop_lets_running_match_finish() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(
            ScriptedFactory::new(FOOLS_MATE).with_move_delay(Duration::from_millis(50)),
        );
        let t = tournament(settings(&dir, 4, 1), &factory);
        let mut events = t.subscribe();

        let handle = tokio::spawn({
            let t = t.clone();
            async move { t.run().await }
        });
        loop {
            if let TournamentEvent::MatchStarted { .. } = events.recv().await.unwrap() {
                break;
            }
        }
        t.stop();

        let results = handle.await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].termination, Termination::Checkmate);
        assert_eq!(t.store().load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE).with_behaviour(
            |_, index| {
                if index == 1 {
                    Behaviour::Panic
                } else {
                    Behaviour::Normal
                }
            },
        ));
        let t = tournament(settings(&dir, 3, 1), &factory);

        let results = t.run().await.unwrap();

        assert_eq!(results.len(), 3);
        let aborted: Vec<_> = results.iter().filter(|r| r.is_aborted()).collect();
        assert_eq!(aborted.len(), 1);
        assert_eq!(aborted[0].termination, Termination::Error);
        assert!(aborted[0].error.as_deref().unwrap().contains("crashed"));
        assert!(t.store().pgn_path(aborted[0].match_id).exists());

        let stats = t.live_stats();
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.decided(), 2);
    }

    #[tokio::test]
    async fn test_start_failure_aborts_only_that_match() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE).with_behaviour(
            |name, index| {
                if name == "beta" && index < 2 {
                    Behaviour::FailStart
                } else {
                    Behaviour::Normal
                }
            },
        ));
        let t = tournament(settings(&dir, 2, 1), &factory);

        let results = t.run().await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_aborted()).count(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut settings = settings(&dir, 2, 2);
        settings.results_file = blocker.join("results.json");

        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let results = tournament(settings, &factory).run().await.unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_events_cover_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new(FOOLS_MATE));
        let t = tournament(settings(&dir, 2, 2), &factory);
        let mut rx = t.subscribe();

        t.run().await.unwrap();

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        let started = received
            .iter()
            .filter(|e| matches!(e, TournamentEvent::MatchStarted { .. }))
            .count();
        let moves = received
            .iter()
            .filter(|e| matches!(e, TournamentEvent::MoveApplied { .. }))
            .count();
        let ended = received
            .iter()
            .filter(|e| matches!(e, TournamentEvent::MatchEnded { .. }))
            .count();
        assert_eq!((started, moves, ended), (2, 8, 2));

        match received.last() {
            Some(TournamentEvent::Finished { stats }) => assert_eq!(stats.completed_matches, 2),
            other => panic!("expected Finished last, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_opening_book_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&dir, 4, 4);
        settings.use_opening_book = true;
        let factory = Arc::new(ScriptedFactory::new(&[]));

        let results = tournament(settings, &factory).run().await.unwrap();

        assert_eq!(results.len(), 4);
        // The scripted engines resign immediately, so no engine moves are recorded.
        let start = Opening::starting_position();
        assert!(results.iter().all(|r| r.moves.is_empty()));
        assert!(results.iter().all(|r| r.termination == Termination::Resignation));
        assert!(results.iter().all(|r| r.opening_name != start.name));
    }
}
