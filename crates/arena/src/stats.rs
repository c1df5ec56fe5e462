//! Tournament statistics and Elo estimation.
//!
//! Everything here is a pure function of the result list, so statistics can be
//! recomputed at any point of a run. Wins are attributed by colour: a result
//! counts for whichever participant played the winning colour in that match.
//! Aborted matches count as played but never as a win, loss or draw.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::game_runner::{MatchResult, Outcome};

/// Score fractions are clamped to this distance from 0 and 1.
const SCORE_CLAMP: f64 = 0.001;

/// Rating points per percentage point of score, for the error margin.
const ELO_PER_PERCENT: f64 = 8.0;

/// z-value of a two-sided 95% normal interval.
const Z_95: f64 = 1.96;

/// Elo difference implied by a score fraction `p` in `[0, 1]`.
///
/// `-400 * log10(1/p - 1)`, with `p` clamped to `[0.001, 0.999]`.
pub fn elo_from_score(p: f64) -> f64 {
    let p = p.clamp(SCORE_CLAMP, 1.0 - SCORE_CLAMP);
    -400.0 * (1.0 / p - 1.0).log10()
}

/// Elo difference and approximate 95% margin from a win/loss/draw record.
///
/// The margin is a normal approximation over the per-game score variance,
/// not an exact likelihood interval. Returns `(0.0, 0.0)` without games.
pub fn elo_difference(wins: u32, losses: u32, draws: u32) -> (f64, f64) {
    let total = f64::from(wins + losses + draws);
    if total == 0.0 {
        return (0.0, 0.0);
    }

    let score = (f64::from(wins) + 0.5 * f64::from(draws)) / total;
    let p = score.clamp(SCORE_CLAMP, 1.0 - SCORE_CLAMP);
    let elo = elo_from_score(p);

    let variance = (f64::from(wins) * (1.0 - p).powi(2)
        + f64::from(losses) * p.powi(2)
        + f64::from(draws) * (0.5 - p).powi(2))
        / total;
    let margin = Z_95 * variance.sqrt() * ELO_PER_PERCENT * 100.0 / total.sqrt();

    (elo, margin)
}

/// Results grouped by opening.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningStats {
    pub name: String,
    pub matches: u32,
    pub a_wins: u32,
    pub b_wins: u32,
    pub draws: u32,
}

/// Aggregate view of a tournament, from participant A's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentStats {
    pub participant_a: String,
    pub participant_b: String,
    /// Matches with a recorded result, aborted ones included.
    pub completed_matches: u32,
    pub aborted: u32,
    pub a_wins: u32,
    pub b_wins: u32,
    pub draws: u32,
    pub a_score: f64,
    pub b_score: f64,
    pub elo_difference: f64,
    pub elo_margin: f64,
    /// A's score fraction, 0.5 before any decided match.
    pub win_rate_a: f64,
    /// Keyed by ECO code.
    pub openings: BTreeMap<String, OpeningStats>,
    /// Keyed by termination tag.
    pub terminations: BTreeMap<String, u32>,
    /// Engine moves per recorded match.
    pub average_length: f64,
}

impl TournamentStats {
    /// Statistics before any match has finished.
    pub fn empty(participant_a: &str, participant_b: &str) -> Self {
        analyze(&[], participant_a, participant_b)
    }

    /// Matches that ended with a win, loss or draw.
    pub fn decided(&self) -> u32 {
        self.a_wins + self.b_wins + self.draws
    }
}

enum Credit {
    A,
    B,
    Draw,
    Aborted,
}

fn credit(result: &MatchResult, participant_a: &str) -> Credit {
    match result.outcome {
        Outcome::Draw => Credit::Draw,
        Outcome::Aborted => Credit::Aborted,
        Outcome::WhiteWins | Outcome::BlackWins => {
            if result.winner() == Some(participant_a) {
                Credit::A
            } else {
                Credit::B
            }
        }
    }
}

/// Aggregates results into statistics for participant A against B.
pub fn analyze(
    results: &[MatchResult],
    participant_a: &str,
    participant_b: &str,
) -> TournamentStats {
    let mut a_wins = 0;
    let mut b_wins = 0;
    let mut draws = 0;
    let mut aborted = 0;
    let mut total_moves = 0usize;
    let mut openings: BTreeMap<String, OpeningStats> = BTreeMap::new();
    let mut terminations: BTreeMap<String, u32> = BTreeMap::new();

    for result in results {
        *terminations
            .entry(result.termination.as_str().to_string())
            .or_default() += 1;
        total_moves += result.move_count;

        let opening = openings
            .entry(result.opening_eco.clone())
            .or_insert_with(|| OpeningStats {
                name: result.opening_name.clone(),
                ..OpeningStats::default()
            });
        opening.matches += 1;

        match credit(result, participant_a) {
            Credit::A => {
                a_wins += 1;
                opening.a_wins += 1;
            }
            Credit::B => {
                b_wins += 1;
                opening.b_wins += 1;
            }
            Credit::Draw => {
                draws += 1;
                opening.draws += 1;
            }
            Credit::Aborted => aborted += 1,
        }
    }

    let a_score = f64::from(a_wins) + 0.5 * f64::from(draws);
    let b_score = f64::from(b_wins) + 0.5 * f64::from(draws);
    let decided = a_wins + b_wins + draws;
    let (elo_difference, elo_margin) = elo_difference(a_wins, b_wins, draws);
    let win_rate_a = if decided > 0 {
        a_score / f64::from(decided)
    } else {
        0.5
    };
    let average_length = if results.is_empty() {
        0.0
    } else {
        total_moves as f64 / results.len() as f64
    };

    TournamentStats {
        participant_a: participant_a.to_string(),
        participant_b: participant_b.to_string(),
        completed_matches: results.len() as u32,
        aborted,
        a_wins,
        b_wins,
        draws,
        a_score,
        b_score,
        elo_difference,
        elo_margin,
        win_rate_a,
        openings,
        terminations,
        average_length,
    }
}
