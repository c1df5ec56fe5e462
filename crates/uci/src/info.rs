//! UCI info line parsing.

use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = engine winning, negative = engine losing).
    Mate(i32),
}

/// Search information reported by an engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Score evaluation from the engine's point of view.
    pub score: Option<Score>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Parse a UCI info line. Returns `None` for non-info lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace().peekable();
        if parts.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::default();

        while let Some(keyword) = parts.next() {
            match keyword {
                "depth" => info.depth = parts.next().and_then(|s| s.parse().ok()),
                "seldepth" => info.seldepth = parts.next().and_then(|s| s.parse().ok()),
                "nodes" => info.nodes = parts.next().and_then(|s| s.parse().ok()),
                "nps" => info.nps = parts.next().and_then(|s| s.parse().ok()),
                "time" => info.time = parts.next().and_then(|s| s.parse().ok()),
                "score" => {
                    let kind = parts.next();
                    let value = parts.next().and_then(|s| s.parse().ok());
                    info.score = match (kind, value) {
                        (Some("cp"), Some(v)) => Some(Score::Cp(v)),
                        (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                        _ => info.score,
                    };
                }
                "pv" => {
                    while let Some(mv) = parts.next_if(|s| !is_info_keyword(s)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    info.string = Some(rest.join(" "));
                }
                // lowerbound/upperbound, currmove, hashfull, ... carry no data we keep.
                _ => {}
            }
        }

        Some(info)
    }
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "score"
            | "nodes"
            | "nps"
            | "time"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "tbhits"
            | "string"
    )
}
