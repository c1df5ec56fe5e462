//! Human-readable summaries and file exports of tournament results.

use chrono::Utc;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::game_runner::MatchResult;
use crate::stats::TournamentStats;

const TOP_OPENINGS: usize = 5;

const CSV_HEADER: &str = "match_id,white,black,result,winner,termination,opening_eco,\
                          opening_name,move_count,duration_seconds,error";

/// Renders statistics as a plain-text report for the terminal.
pub fn render_report(stats: &TournamentStats) -> String {
    let a = &stats.participant_a;
    let b = &stats.participant_b;
    let mut out = String::new();

    let title = format!("Tournament: {} vs {}", a, b);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
    let _ = writeln!(
        out,
        "Matches:        {} ({} aborted)",
        stats.completed_matches, stats.aborted
    );
    let _ = writeln!(
        out,
        "Result:         {} {} - {} {}, {} drawn",
        a, stats.a_wins, stats.b_wins, b, stats.draws
    );
    let _ = writeln!(
        out,
        "Score:          {} {:.1} / {} {:.1}",
        a, stats.a_score, b, stats.b_score
    );
    if stats.decided() > 0 {
        let _ = writeln!(
            out,
            "Elo difference: {:+.1} ± {:.1} ({} relative to {})",
            stats.elo_difference, stats.elo_margin, a, b
        );
    } else {
        let _ = writeln!(out, "Elo difference: n/a");
    }
    let _ = writeln!(out, "Win rate:       {:.1}%", stats.win_rate_a * 100.0);
    let _ = writeln!(out, "Average length: {:.1} moves", stats.average_length);

    if !stats.terminations.is_empty() {
        let mut terminations: Vec<(&String, &u32)> = stats.terminations.iter().collect();
        terminations.sort_by(|x, y| y.1.cmp(x.1).then_with(|| x.0.cmp(y.0)));

        let _ = writeln!(out, "\nTerminations:");
        for (tag, count) in terminations {
            let _ = writeln!(out, "  {:<22} {}", tag, count);
        }
    }

    if !stats.openings.is_empty() {
        let mut openings: Vec<_> = stats.openings.iter().collect();
        openings.sort_by(|x, y| y.1.matches.cmp(&x.1.matches).then_with(|| x.0.cmp(y.0)));

        let _ = writeln!(out, "\nTop openings:");
        for (eco, opening) in openings.into_iter().take(TOP_OPENINGS) {
            let _ = writeln!(
                out,
                "  {} {:<28} {} played ({} {}, {} {}, {} drawn)",
                eco, opening.name, opening.matches, a, opening.a_wins, b, opening.b_wins,
                opening.draws
            );
        }
    }
    out
}

#[derive(Serialize)]
struct StatsJson<'a> {
    generated_at: String,
    #[serde(flatten)]
    stats: &'a TournamentStats,
}

/// Writes the statistics as pretty-printed JSON.
pub fn write_stats_json<P: AsRef<Path>>(path: P, stats: &TournamentStats) -> std::io::Result<()> {
    create_parent(path.as_ref())?;
    let json = StatsJson {
        generated_at: Utc::now().to_rfc3339(),
        stats,
    };
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &json)?;
    Ok(())
}

/// Writes one CSV row per match, ordered by match id.
pub fn write_results_csv<P: AsRef<Path>>(path: P, results: &[MatchResult]) -> std::io::Result<()> {
    create_parent(path.as_ref())?;
    let mut sorted: Vec<&MatchResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.match_id);

    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for r in sorted {
        let row = [
            r.match_id.to_string(),
            csv_field(&r.white),
            csv_field(&r.black),
            r.outcome.to_string(),
            csv_field(r.winner().unwrap_or("")),
            r.termination.to_string(),
            csv_field(&r.opening_eco),
            csv_field(&r.opening_name),
            r.move_count.to_string(),
            format!("{:.3}", r.duration_seconds),
            csv_field(r.error.as_deref().unwrap_or("")),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    std::fs::write(path, csv)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
