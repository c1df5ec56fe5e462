//! Opening book lookup and tournament opening assignment.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::builtin::builtin_openings;
use crate::opening::Opening;

/// Errors that can occur when looking up openings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpeningError {
    /// No opening with the requested ECO code exists in the book.
    #[error("opening {0} not found")]
    NotFound(String),
}

/// A fixed catalog of openings that matches are started from.
///
/// The book hands out openings for a whole tournament at once through
/// [`OpeningBook::build_pairing`], so that each opening is played with both
/// color assignments.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    openings: Vec<Opening>,
}

impl OpeningBook {
    /// Creates a book backed by the built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self::with_openings(builtin_openings())
    }

    /// Creates a book with the given openings.
    #[must_use]
    pub fn with_openings(openings: Vec<Opening>) -> Self {
        Self { openings }
    }

    /// Returns the number of openings in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.openings.len()
    }

    /// Returns true if the book contains no openings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }

    /// Returns all openings in catalog order.
    #[must_use]
    pub fn all(&self) -> &[Opening] {
        &self.openings
    }

    /// Picks a uniformly random opening.
    ///
    /// An empty book yields the starting position.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Opening {
        self.openings
            .choose(rng)
            .cloned()
            .unwrap_or_else(Opening::starting_position)
    }

    /// Finds the opening with the given ECO code.
    ///
    /// # Errors
    ///
    /// Returns [`OpeningError::NotFound`] if no opening has that code.
    pub fn pick_by_code(&self, code: &str) -> Result<&Opening, OpeningError> {
        self.openings
            .iter()
            .find(|o| o.eco == code)
            .ok_or_else(|| OpeningError::NotFound(code.to_string()))
    }

    /// Builds the opening assignment for an `n`-match tournament.
    ///
    /// Every catalog opening is scheduled `2 * k` times, where
    /// `k = max(1, n / (2 * len))`, so that (up to rounding) each one is played
    /// once with each color assignment. Remaining slots are filled with
    /// independent random draws, the whole list is shuffled so that slot
    /// position carries no information about the opening, and the result is
    /// truncated to exactly `n` entries.
    pub fn build_pairing<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Opening> {
        if self.openings.is_empty() {
            return vec![Opening::starting_position(); n];
        }

        let per_opening = (n / (self.openings.len() * 2)).max(1);
        let mut assigned = Vec::with_capacity(n.max(self.openings.len() * 2));

        for opening in &self.openings {
            for _ in 0..per_opening {
                assigned.push(opening.clone());
                assigned.push(opening.clone());
            }
        }

        while assigned.len() < n {
            assigned.push(self.pick_random(rng));
        }

        assigned.shuffle(rng);
        assigned.truncate(n);
        assigned
    }
}
