//! Opening catalog and opening assignment for engine matches.
//!
//! This crate provides the fixed opening catalog that tournaments start their
//! games from, plus the selector that spreads the catalog over a tournament so
//! that every opening is played with both color assignments.

pub mod book;
pub mod builtin;
pub mod opening;

pub use book::{OpeningBook, OpeningError};
pub use builtin::builtin_openings;
pub use opening::Opening;
