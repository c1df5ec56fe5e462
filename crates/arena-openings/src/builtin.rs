//! Built-in opening catalog.
//!
//! This module provides the fixed set of openings that tournaments draw from
//! when the opening book is enabled.

use crate::opening::Opening;

/// Creates the built-in opening catalog.
///
/// Returns 24 well-known openings, each with a distinct ECO code, covering:
/// - Open Games (1.e4 e5)
/// - Semi-Open Games (1.e4, other responses)
/// - Closed Games (1.d4 d5)
/// - Indian Defenses (1.d4 Nf6)
/// - Flank Openings (1.c4, 1.Nf3, 1.f4)
///
/// Lines are short (one to five moves per side) so the engines still decide
/// the middlegame.
#[must_use]
pub fn builtin_openings() -> Vec<Opening> {
    vec![
        // ======================================================================
        // OPEN GAMES (1.e4 e5)
        // ======================================================================
        Opening::new(
            "Italian Game",
            "C50",
            &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"],
        ),
        Opening::new("Ruy Lopez", "C60", &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]),
        Opening::new(
            "Scotch Game",
            "C45",
            &["e2e4", "e7e5", "g1f3", "b8c6", "d2d4", "e5d4"],
        ),
        Opening::new(
            "Four Knights",
            "C47",
            &["e2e4", "e7e5", "g1f3", "b8c6", "b1c3", "g8f6"],
        ),
        Opening::new("Petroff Defense", "C42", &["e2e4", "e7e5", "g1f3", "g8f6"]),
        Opening::new("King's Gambit", "C30", &["e2e4", "e7e5", "f2f4"]),
        // ======================================================================
        // SEMI-OPEN GAMES (1.e4 other)
        // ======================================================================
        Opening::new(
            "Sicilian Najdorf",
            "B90",
            &[
                "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6",
            ],
        ),
        Opening::new(
            "Sicilian Dragon",
            "B70",
            &[
                "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "g7g6",
            ],
        ),
        Opening::new("French Defense", "C00", &["e2e4", "e7e6", "d2d4", "d7d5"]),
        Opening::new("Caro-Kann", "B10", &["e2e4", "c7c6", "d2d4", "d7d5"]),
        Opening::new(
            "Pirc Defense",
            "B07",
            &["e2e4", "d7d6", "d2d4", "g8f6", "b1c3", "g7g6"],
        ),
        Opening::new("Scandinavian", "B01", &["e2e4", "d7d5", "e4d5", "d8d5"]),
        // ======================================================================
        // CLOSED GAMES (1.d4 d5)
        // ======================================================================
        Opening::new(
            "Queen's Gambit Declined",
            "D30",
            &["d2d4", "d7d5", "c2c4", "e7e6"],
        ),
        Opening::new(
            "Queen's Gambit Accepted",
            "D20",
            &["d2d4", "d7d5", "c2c4", "d5c4"],
        ),
        Opening::new("Slav Defense", "D10", &["d2d4", "d7d5", "c2c4", "c7c6"]),
        Opening::new("London System", "D00", &["d2d4", "d7d5", "c1f4"]),
        // ======================================================================
        // INDIAN DEFENSES (1.d4 Nf6)
        // ======================================================================
        Opening::new(
            "King's Indian",
            "E60",
            &["d2d4", "g8f6", "c2c4", "g7g6", "b1c3", "f8g7"],
        ),
        Opening::new(
            "Nimzo-Indian",
            "E20",
            &["d2d4", "g8f6", "c2c4", "e7e6", "b1c3", "f8b4"],
        ),
        Opening::new(
            "Queen's Indian",
            "E12",
            &["d2d4", "g8f6", "c2c4", "e7e6", "g1f3", "b7b6"],
        ),
        Opening::new(
            "Grünfeld Defense",
            "D80",
            &["d2d4", "g8f6", "c2c4", "g7g6", "b1c3", "d7d5"],
        ),
        // ======================================================================
        // FLANK OPENINGS
        // ======================================================================
        Opening::new("English Opening", "A10", &["c2c4"]),
        Opening::new("Réti Opening", "A04", &["g1f3", "d7d5", "c2c4"]),
        Opening::new("King's Indian Attack", "A07", &["g1f3", "d7d5", "g2g3"]),
        Opening::new("Bird's Opening", "A02", &["f2f4"]),
    ]
}
