//! Configuration file loading for the arena.
//!
//! This module provides types and functions for loading engine definitions,
//! tournament settings and presets from `arena.toml`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::clock::TimeControl;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Requested engine was not found in the configuration.
    #[error("Engine not found: {0}")]
    EngineNotFound(String),
    /// Requested preset was not found in the configuration.
    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

/// Configuration for a UCI engine.
///
/// The engine's name is the key of its `[engines.<name>]` table and is filled
/// in by [`ArenaConfig::get_engine`].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    #[serde(skip)]
    pub name: String,
    /// Path to the engine executable.
    pub path: PathBuf,
    /// Extra command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// UCI options sent with `setoption` before the first game.
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            args: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Options as `(name, value)` pairs ready for `setoption`.
    pub fn uci_options(&self) -> Vec<(String, String)> {
        self.options
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

/// The `[tournament]` table.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TournamentConfig {
    /// Name of participant A, an `[engines]` key.
    #[serde(default = "default_engine_a")]
    pub engine_a: String,
    /// Name of participant B, an `[engines]` key.
    #[serde(default = "default_engine_b")]
    pub engine_b: String,
    /// Number of matches. Defaults to 100.
    #[serde(default = "default_games")]
    pub games: u32,
    /// Matches allowed to run at once. Defaults to 4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub time_control: TimeControl,
    /// Start matches from the opening book instead of the initial position.
    #[serde(default = "default_true")]
    pub use_opening_book: bool,
    /// Directory for per-match PGN files and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Snapshot file used to resume interrupted runs.
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,
}

fn default_engine_a() -> String {
    "lc0".to_string()
}

fn default_engine_b() -> String {
    "stockfish".to_string()
}

fn default_games() -> u32 {
    100
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_results_file() -> PathBuf {
    PathBuf::from("output/results.json")
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            engine_a: default_engine_a(),
            engine_b: default_engine_b(),
            games: default_games(),
            concurrency: default_concurrency(),
            time_control: TimeControl::default(),
            use_opening_book: true,
            output_dir: default_output_dir(),
            results_file: default_results_file(),
        }
    }
}

/// Configuration for a tournament preset.
///
/// Every field is optional and overrides the `[tournament]` value it names.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PresetConfig {
    pub games: Option<u32>,
    pub concurrency: Option<usize>,
    pub time_control: Option<TimeControl>,
    pub use_opening_book: Option<bool>,
}

/// Main arena configuration structure.
///
/// Uses `arena.toml` in the current directory by default.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ArenaConfig {
    #[serde(default)]
    pub engines: HashMap<String, EngineConfig>,
    #[serde(default)]
    pub tournament: TournamentConfig,
    #[serde(default)]
    pub presets: HashMap<String, PresetConfig>,
}

impl ArenaConfig {
    /// Loads the arena configuration from `path`.
    ///
    /// Returns the default configuration when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Default location of the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("arena.toml")
    }

    /// Retrieves an engine configuration by name, with its name filled in.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EngineNotFound`] if no engine with the given name exists.
    pub fn get_engine(&self, name: &str) -> Result<EngineConfig, ConfigError> {
        self.engines
            .get(name)
            .map(|engine| EngineConfig {
                name: name.to_string(),
                ..engine.clone()
            })
            .ok_or_else(|| ConfigError::EngineNotFound(name.to_string()))
    }

    /// The `[tournament]` settings with a preset's overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PresetNotFound`] if the preset does not exist.
    pub fn tournament_with_preset(
        &self,
        preset: Option<&str>,
    ) -> Result<TournamentConfig, ConfigError> {
        let mut tournament = self.tournament.clone();
        let Some(name) = preset else {
            return Ok(tournament);
        };
        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
        if let Some(games) = preset.games {
            tournament.games = games;
        }
        if let Some(concurrency) = preset.concurrency {
            tournament.concurrency = concurrency;
        }
        if let Some(time_control) = preset.time_control {
            tournament.time_control = time_control;
        }
        if let Some(use_opening_book) = preset.use_opening_book {
            tournament.use_opening_book = use_opening_book;
        }
        Ok(tournament)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[engines.stockfish]
path = "/usr/bin/stockfish"
options = { Threads = 1, Hash = 64 }

[engines.lc0]
path = "/opt/lc0/lc0"
args = ["--backend=blas"]
options = { WeightsFile = "/opt/lc0/weights.pb.gz" }

[tournament]
engine_a = "lc0"
engine_b = "stockfish"
games = 50
concurrency = 2
time_control = { base_seconds = 30.0, increment_seconds = 0.25 }
output_dir = "runs/a"
results_file = "runs/a/results.json"

[presets.quick]
games = 4
time_control = { base_seconds = 5.0 }

[presets.serial]
concurrency = 1
use_opening_book = false
"#;

    #[test]
    fn test_parse_valid_toml_config() {
        let config: ArenaConfig = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.engines.len(), 2);
        let lc0 = config.get_engine("lc0").unwrap();
        assert_eq!(lc0.name, "lc0");
        assert_eq!(lc0.path, PathBuf::from("/opt/lc0/lc0"));
        assert_eq!(lc0.args, vec!["--backend=blas"]);

        let t = &config.tournament;
        assert_eq!(t.engine_a, "lc0");
        assert_eq!(t.games, 50);
        assert_eq!(t.concurrency, 2);
        assert_eq!(t.time_control, TimeControl::new(30.0, 0.25));
        assert!(t.use_opening_book);
        assert_eq!(t.results_file, PathBuf::from("runs/a/results.json"));
    }

    #[test]
    fn test_uci_options_are_plain_strings() {
        let config: ArenaConfig = toml::from_str(SAMPLE).unwrap();

        let stockfish = config.get_engine("stockfish").unwrap();
        assert_eq!(
            stockfish.uci_options(),
            vec![
                ("Hash".to_string(), "64".to_string()),
                ("Threads".to_string(), "1".to_string()),
            ]
        );

        let lc0 = config.get_engine("lc0").unwrap();
        assert_eq!(
            lc0.uci_options(),
            vec![(
                "WeightsFile".to_string(),
                "/opt/lc0/weights.pb.gz".to_string()
            )]
        );
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: ArenaConfig = toml::from_str("").unwrap();

        assert!(config.engines.is_empty());
        assert!(config.presets.is_empty());
        assert_eq!(config.tournament, TournamentConfig::default());
        assert_eq!(config.tournament.games, 100);
        assert_eq!(config.tournament.concurrency, 4);
        assert_eq!(config.tournament.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_get_engine_returns_error_for_unknown_engine() {
        let config = ArenaConfig::default();

        match config.get_engine("nonexistent") {
            Err(ConfigError::EngineNotFound(name)) => assert_eq!(name, "nonexistent"),
            other => panic!("Expected EngineNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_preset_overrides_only_named_fields() {
        let config: ArenaConfig = toml::from_str(SAMPLE).unwrap();

        let quick = config.tournament_with_preset(Some("quick")).unwrap();
        assert_eq!(quick.games, 4);
        assert_eq!(quick.concurrency, 2);
        assert_eq!(quick.time_control, TimeControl::new(5.0, 0.0));

        let serial = config.tournament_with_preset(Some("serial")).unwrap();
        assert_eq!(serial.games, 50);
        assert_eq!(serial.concurrency, 1);
        assert!(!serial.use_opening_book);

        let none = config.tournament_with_preset(None).unwrap();
        assert_eq!(none, config.tournament);
    }

    #[test]
    fn test_unknown_preset_is_error() {
        let config = ArenaConfig::default();
        assert!(matches!(
            config.tournament_with_preset(Some("blitz")),
            Err(ConfigError::PresetNotFound(_))
        ));
    }

    #[test]
    fn test_load_from_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArenaConfig::load_from(dir.path().join("arena.toml")).unwrap();
        assert!(config.engines.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = ArenaConfig::load_from(&path).unwrap();
        assert_eq!(config.presets.len(), 2);
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, "[engines.broken\npath = ").unwrap();

        assert!(matches!(
            ArenaConfig::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_config_path_returns_expected_path() {
        assert_eq!(ArenaConfig::config_path(), PathBuf::from("arena.toml"));
    }
}
