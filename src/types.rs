//! Shared types for the PROPEDGE scanner.
//!
//! These types form the data model used across all modules: marketplace
//! props, sportsbook quotes, devigged probabilities, and the opportunity
//! records a scan hands back to its caller.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Marketplace props
// ---------------------------------------------------------------------------

/// A fixed-payout marketplace line for one player and stat category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    /// Player name as spelled by the marketplace.
    pub player_name: String,
    pub team: String,
    /// Marketplace stat category, e.g. "Points" or "Pts+Rebs+Asts".
    pub stat_type: String,
    pub line: f64,
    pub start_time: Option<DateTime<Utc>>,
    /// "standard" for two-sided More/Less props; "goblin"/"demon" otherwise.
    pub odds_type: String,
}

impl Prop {
    /// Only standard (two-sided) props can be compared against devigged odds.
    pub fn is_standard(&self) -> bool {
        self.odds_type.eq_ignore_ascii_case("standard")
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.player_name, self.stat_type, self.line)
    }
}

// ---------------------------------------------------------------------------
// Sportsbook odds (wire shapes from the odds provider)
// ---------------------------------------------------------------------------

/// An upcoming game as listed by the odds provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub commence_time: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.away_team, self.home_team)
    }
}

/// Per-event odds payload: every bookmaker's player-prop markets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventOdds {
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub key: String,
    #[serde(default)]
    pub markets: Vec<BookMarket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

/// One side of a player line. The provider puts the side in `name`
/// ("Over"/"Under") and the player in `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(rename = "description", default)]
    pub player_name: String,
    #[serde(rename = "name")]
    pub side: String,
    /// American odds.
    pub price: f64,
    /// The line. Absent on some malformed entries.
    #[serde(default)]
    pub point: Option<f64>,
}

/// One bookmaker's two-sided price for a (player, market, line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportsbookQuote {
    pub sportsbook: String,
    pub market: String,
    pub line: f64,
    pub over_odds: i32,
    pub under_odds: i32,
}

impl fmt::Display for SportsbookQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} (O {:+} / U {:+})",
            self.sportsbook, self.market, self.line, self.over_odds, self.under_odds
        )
    }
}

/// Grouping key for sportsbook quotes. Lines must match exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuoteKey {
    pub player: String,
    pub market: String,
    pub line: OrderedFloat<f64>,
}

impl QuoteKey {
    pub fn new(player: impl Into<String>, market: impl Into<String>, line: f64) -> Self {
        Self {
            player: player.into(),
            market: market.into(),
            line: OrderedFloat(line),
        }
    }
}

// ---------------------------------------------------------------------------
// Probabilities
// ---------------------------------------------------------------------------

/// Vig-free (over, under) probabilities. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairProbabilityPair {
    pub over: f64,
    pub under: f64,
}

impl FairProbabilityPair {
    pub fn sum(&self) -> f64 {
        self.over + self.under
    }
}

impl fmt::Display for FairProbabilityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}% over / {:.2}% under", self.over * 100.0, self.under * 100.0)
    }
}

/// A single sportsbook's devigged probability, the unit of consensus input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookProbability {
    pub sportsbook: String,
    pub fair_over: f64,
    pub fair_under: f64,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Recommended pick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Over => "over",
            Side::Under => "under",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "over" | "more" => Ok(Side::Over),
            "under" | "less" => Ok(Side::Under),
            other => anyhow::bail!("Unknown side: {other}"),
        }
    }
}

/// Edge quality label, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeQuality {
    Noise,
    Marginal,
    Good,
    #[serde(rename = "Very Good")]
    VeryGood,
    Excellent,
}

impl EdgeQuality {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeQuality::Noise => "Noise",
            EdgeQuality::Marginal => "Marginal",
            EdgeQuality::Good => "Good",
            EdgeQuality::VeryGood => "Very Good",
            EdgeQuality::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for EdgeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A +EV marketplace pick backed by sportsbook consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub player_name: String,
    pub stat_type: String,
    pub league: String,
    pub line: f64,
    pub fair_prob_over: f64,
    pub fair_prob_under: f64,
    pub recommended_side: Side,
    /// Chosen-side edge over the payout structure's break-even rate.
    pub edge: f64,
    pub num_books: usize,
    pub books_used: Vec<String>,
    pub quality: EdgeQuality,
    pub game_time: Option<DateTime<Utc>>,
    pub found_at: DateTime<Utc>,
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} (edge {:+.2}% | {} | {} books)",
            self.player_name,
            self.stat_type,
            self.recommended_side,
            self.line,
            self.edge * 100.0,
            self.quality,
            self.num_books,
        )
    }
}

// ---------------------------------------------------------------------------
// Scan report
// ---------------------------------------------------------------------------

/// Result of one scan. Empty opportunity lists always carry a `reason`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub league: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub min_edge: f64,
    pub props_fetched: usize,
    pub markets_requested: Vec<String>,
    pub events_found: usize,
    pub events_failed: usize,
    pub players_matched: usize,
    pub props_priced: usize,
    pub credits_remaining: Option<u64>,
    pub opportunities: Vec<Opportunity>,
    pub reason: Option<String>,
}

impl ScanReport {
    pub fn new(league: &str, min_edge: f64) -> Self {
        let now = Utc::now();
        Self {
            scan_id: Uuid::new_v4(),
            league: league.to_string(),
            started_at: now,
            finished_at: now,
            min_edge,
            props_fetched: 0,
            markets_requested: Vec::new(),
            events_found: 0,
            events_failed: 0,
            players_matched: 0,
            props_priced: 0,
            credits_remaining: None,
            opportunities: Vec::new(),
            reason: None,
        }
    }

    /// Close the report early with an explanation.
    pub fn finish_with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self.finished_at = Utc::now();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    pub fn best_edge(&self) -> Option<f64> {
        self.opportunities.iter().map(|o| o.edge).reduce(f64::max)
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scan {} [{}]: props={} events={} (failed {}) matched={} priced={} +EV={}",
            self.scan_id,
            self.league,
            self.props_fetched,
            self.events_found,
            self.events_failed,
            self.players_matched,
            self.props_priced,
            self.opportunities.len(),
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for PROPEDGE.
#[derive(Debug, thiserror::Error)]
pub enum PropEdgeError {
    #[error("Devig failed for over {over_odds} / under {under_odds}: {reason}")]
    Devig {
        over_odds: i32,
        under_odds: i32,
        reason: String,
    },

    #[error("Cannot build consensus from zero sportsbook quotes")]
    EmptyConsensus,

    #[error("Unknown payout structure: {0}")]
    UnknownPayoutStructure(String),

    #[error("Unknown league: {0}")]
    UnknownLeague(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
