//! Command-line interface definitions and result rendering.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::storage::{PlayerOverride, StoredOpportunity};
use crate::types::{Opportunity, ScanReport, Side};

/// PROPEDGE - +EV player-prop scanner.
#[derive(Parser, Debug)]
#[command(name = "propedge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one scan and print the ranked opportunities
    Scan(ScanArgs),

    /// Scan on an interval until Ctrl+C
    Watch(WatchArgs),

    /// Manage manual player-name overrides
    #[command(subcommand)]
    Override(OverrideCommand),

    /// List saved opportunities that haven't been settled
    Pending,

    /// Record how a saved opportunity settled
    Settle(SettleArgs),
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// League to scan (NBA, NFL, NHL, MLB, CBB, CFB)
    #[arg(short, long)]
    pub league: Option<String>,

    /// Minimum edge in percent (2.0 = 2%)
    #[arg(long)]
    pub min_edge: Option<f64>,

    /// Also write results to ev_results_{league}.{csv|json}
    #[arg(long, value_enum)]
    pub export: Option<ExportFormat>,

    /// Don't persist opportunities to the database
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    #[arg(short, long)]
    pub league: Option<String>,

    /// Minimum edge in percent (2.0 = 2%)
    #[arg(long)]
    pub min_edge: Option<f64>,

    /// Seconds between scans (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Serve the JSON dashboard while watching
    #[arg(long)]
    pub dashboard: bool,
}

#[derive(Subcommand, Debug)]
pub enum OverrideCommand {
    /// Map a marketplace name to the sportsbook spelling
    Add(OverrideAddArgs),
    /// Show every stored override
    List,
}

#[derive(Parser, Debug)]
pub struct OverrideAddArgs {
    /// Name as the marketplace spells it
    pub prizepicks_name: String,
    /// Name as the sportsbook feed spells it
    pub odds_api_name: String,
    #[arg(short, long, default_value = "NBA")]
    pub league: String,
}

#[derive(Parser, Debug)]
pub struct SettleArgs {
    pub id: i64,
    /// hit, miss, push or pending
    pub result: String,
    /// Final stat value
    #[arg(long)]
    pub actual: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Convert a `--min-edge` percentage to a fraction.
pub fn percent_to_fraction(percent: f64) -> f64 {
    percent / 100.0
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const RULE_WIDTH: usize = 66;

/// Ranked block view of a scan, the format printed by `scan` and `watch`.
pub fn render_report(report: &ScanReport) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "{:>20}+EV OPPORTUNITIES ({})", "", report.league);
    let _ = writeln!(out, "{heavy}");

    if report.is_empty() {
        let reason = report.reason.as_deref().unwrap_or("No opportunities found");
        let _ = writeln!(out);
        let _ = writeln!(out, "  {reason}");
        let _ = writeln!(out, "  This is valid data -- edges don't appear every day.");
        let _ = writeln!(out);
        let _ = writeln!(out, "{heavy}");
        return out;
    }

    for (i, opp) in report.opportunities.iter().enumerate() {
        render_opportunity(&mut out, i + 1, opp);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{light}");
    let _ = writeln!(
        out,
        "  Props scanned: {}  |  Matched: {}  |  +EV found: {}",
        report.props_fetched,
        report.players_matched,
        report.opportunities.len()
    );
    if let Some(credits) = report.credits_remaining {
        let _ = writeln!(out, "  Odds API credits remaining: {credits}");
    }
    let _ = writeln!(out, "{heavy}");
    out
}

fn render_opportunity(out: &mut String, rank: usize, opp: &Opportunity) {
    let side = match opp.recommended_side {
        Side::Over => "Over",
        Side::Under => "Under",
    };
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {rank}. {} -- {} {side} {}",
        opp.player_name, opp.stat_type, opp.line
    );
    let _ = writeln!(
        out,
        "     Fair Prob: {:.2}% over / {:.2}% under",
        opp.fair_prob_over * 100.0,
        opp.fair_prob_under * 100.0
    );
    let _ = writeln!(
        out,
        "     Edge: {:+.2}%  |  Quality: {}",
        opp.edge * 100.0,
        opp.quality
    );
    let _ = writeln!(
        out,
        "     Books: {} ({} books)",
        opp.books_used.join(", "),
        opp.num_books
    );
}

pub fn render_pending(rows: &[StoredOpportunity]) -> String {
    if rows.is_empty() {
        return "No pending opportunities.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "#{:<5} {} {} {} {} | edge {:+.2}% | {} | found {}",
            row.id,
            row.player_name,
            row.stat_type,
            row.recommended_side,
            row.line,
            row.edge * 100.0,
            row.quality,
            row.found_at.format("%Y-%m-%d %H:%M"),
        );
    }
    out
}

pub fn render_overrides(rows: &[PlayerOverride]) -> String {
    if rows.is_empty() {
        return "No overrides stored.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "[{}] {} -> {}",
            row.sport, row.prizepicks_name, row.odds_api_name
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

const CSV_COLUMNS: &[&str] = &[
    "player_name",
    "stat_type",
    "recommended_side",
    "line",
    "fair_prob_over",
    "fair_prob_under",
    "edge",
    "num_books",
    "books_used",
    "quality",
    "game_time",
];

pub fn export_path(dir: &Path, league: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!(
        "ev_results_{}.{}",
        league.to_lowercase(),
        format.extension()
    ))
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

pub fn to_csv(opportunities: &[Opportunity]) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');
    for opp in opportunities {
        let row = [
            csv_field(&opp.player_name),
            csv_field(&opp.stat_type),
            opp.recommended_side.to_string(),
            opp.line.to_string(),
            format!("{:.4}", opp.fair_prob_over),
            format!("{:.4}", opp.fair_prob_under),
            format!("{:.4}", opp.edge),
            opp.num_books.to_string(),
            csv_field(&opp.books_used.join(";")),
            csv_field(opp.quality.label()),
            opp.game_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Write the report's opportunities to `dir`. Returns the file written.
pub fn write_export(report: &ScanReport, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    let path = export_path(dir, &report.league, format);
    let contents = match format {
        ExportFormat::Csv => to_csv(&report.opportunities),
        ExportFormat::Json => serde_json::to_string_pretty(&report.opportunities)
            .context("Failed to serialise opportunities")?,
    };
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
