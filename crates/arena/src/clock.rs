//! Per-move time budgeting.
//!
//! Every move is given a fixed slice of the mover's remaining clock plus the
//! increment. The slice is assumed to be consumed in full: the clock is charged
//! the allocated budget, never the measured thinking time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fraction of the remaining clock allotted to a single move.
const BUDGET_FRACTION: f64 = 0.05;

/// Upper bound on the clock share of a single move, before the increment.
const MAX_BUDGET_SECONDS: f64 = 5.0;

/// Extra time an engine gets past its budget before the move is forfeited.
pub const MOVE_GRACE: Duration = Duration::from_secs(5);

/// Base time and per-move increment, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeControl {
    pub base_seconds: f64,
    #[serde(default)]
    pub increment_seconds: f64,
}

impl Default for TimeControl {
    /// One minute plus half a second per move.
    fn default() -> Self {
        Self {
            base_seconds: 60.0,
            increment_seconds: 0.5,
        }
    }
}

impl TimeControl {
    pub fn new(base_seconds: f64, increment_seconds: f64) -> Self {
        Self {
            base_seconds,
            increment_seconds,
        }
    }

    /// Thinking time, in seconds, for a side with `remaining` seconds left.
    ///
    /// `min(remaining * 0.05, 5.0) + increment`. A flagged clock still gets the
    /// increment.
    pub fn budget(&self, remaining: f64) -> f64 {
        let share = (remaining.max(0.0) * BUDGET_FRACTION).min(MAX_BUDGET_SECONDS);
        share + self.increment_seconds
    }

    /// Base and increment are finite, non-negative and the largest possible
    /// budget fits in a [`Duration`].
    pub fn is_valid(&self) -> bool {
        let finite = |secs: f64| secs.is_finite() && secs >= 0.0;
        finite(self.base_seconds)
            && finite(self.increment_seconds)
            && Duration::try_from_secs_f64(MAX_BUDGET_SECONDS + self.increment_seconds).is_ok()
    }

    /// [`Self::budget`] as a [`Duration`]. Zero when [`Self::is_valid`] fails.
    pub fn budget_duration(&self, remaining: f64) -> Duration {
        Duration::try_from_secs_f64(self.budget(remaining)).unwrap_or_default()
    }

    /// Clock after a move that was allotted `budget` seconds.
    ///
    /// Never goes below zero.
    pub fn deduct(&self, remaining: f64, budget: f64) -> f64 {
        (remaining - budget + self.increment_seconds).max(0.0)
    }
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.base_seconds, self.increment_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn budget_is_five_percent_plus_increment() {
        let tc = TimeControl::new(60.0, 0.5);
        assert!(approx(tc.budget(60.0), 3.5));
        assert!(approx(tc.budget(10.0), 1.0));
    }

    #[test]
    fn budget_share_is_capped() {
        let tc = TimeControl::new(600.0, 1.0);
        assert!(approx(tc.budget(600.0), 6.0));
        assert!(approx(tc.budget(100.0), 6.0));
    }

    #[test]
    fn budget_with_empty_clock_is_increment() {
        let tc = TimeControl::new(60.0, 0.25);
        assert!(approx(tc.budget(0.0), 0.25));
        assert!(approx(tc.budget(-3.0), 0.25));
    }

    #[test]
    fn deduct_charges_budget_and_adds_increment() {
        let tc = TimeControl::new(60.0, 0.5);
        let budget = tc.budget(60.0);
        assert!(approx(tc.deduct(60.0, budget), 57.0));
    }

    #[test]
    fn deduct_never_goes_negative() {
        let tc = TimeControl::new(1.0, 0.0);
        assert_eq!(tc.deduct(0.5, 3.0), 0.0);
    }

    #[test]
    fn budget_duration_matches_seconds() {
        let tc = TimeControl::new(60.0, 0.0);
        assert_eq!(tc.budget_duration(60.0), Duration::from_secs(3));
    }

    #[test]
    fn rejects_negative_and_non_finite_values() {
        assert!(TimeControl::default().is_valid());
        assert!(TimeControl::new(0.0, 0.0).is_valid());
        assert!(!TimeControl::new(10.0, -1.0).is_valid());
        assert!(!TimeControl::new(-10.0, 0.0).is_valid());
        assert!(!TimeControl::new(f64::NAN, 0.0).is_valid());
        assert!(!TimeControl::new(10.0, f64::INFINITY).is_valid());
        assert!(!TimeControl::new(10.0, 1e300).is_valid());
    }

    #[test]
    fn invalid_budget_duration_does_not_panic() {
        let tc = TimeControl::new(10.0, -1.0);
        assert_eq!(tc.budget_duration(10.0), Duration::ZERO);
    }

    #[test]
    fn default_and_display() {
        let tc = TimeControl::default();
        assert_eq!(tc.to_string(), "60+0.5");
    }

    #[test]
    fn deserialize_without_increment() {
        let tc: TimeControl = toml::from_str("base_seconds = 30.0").unwrap();
        assert_eq!(tc, TimeControl::new(30.0, 0.0));
    }
}
