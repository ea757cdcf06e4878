//! League and stat-category lookup tables.
//!
//! Maps marketplace leagues to their odds-provider sport keys, and
//! marketplace stat names to odds-provider market keys.

use std::collections::BTreeSet;

use crate::types::{Prop, PropEdgeError};

/// A league known to both the marketplace and the odds provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct League {
    pub name: &'static str,
    /// Marketplace `league_id` query value.
    pub prizepicks_league_id: &'static str,
    pub odds_api_sport_key: &'static str,
}

pub const LEAGUES: &[League] = &[
    League { name: "NBA", prizepicks_league_id: "7", odds_api_sport_key: "basketball_nba" },
    League { name: "NFL", prizepicks_league_id: "9", odds_api_sport_key: "americanfootball_nfl" },
    League { name: "NHL", prizepicks_league_id: "8", odds_api_sport_key: "icehockey_nhl" },
    League { name: "MLB", prizepicks_league_id: "2", odds_api_sport_key: "baseball_mlb" },
    League { name: "CBB", prizepicks_league_id: "20", odds_api_sport_key: "basketball_ncaab" },
    League { name: "CFB", prizepicks_league_id: "15", odds_api_sport_key: "americanfootball_ncaaf" },
];

/// Case-insensitive league lookup.
pub fn league(name: &str) -> Result<&'static League, PropEdgeError> {
    LEAGUES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| PropEdgeError::UnknownLeague(name.to_string()))
}

/// Marketplace stat type → odds-provider market key.
pub const STAT_TYPE_MAP: &[(&str, &str)] = &[
    ("Points", "player_points"),
    ("Rebounds", "player_rebounds"),
    ("Assists", "player_assists"),
    ("3-Pt Made", "player_threes"),
    ("Pts+Rebs+Asts", "player_points_rebounds_assists"),
    ("Pts+Rebs", "player_points_rebounds"),
    ("Pts+Asts", "player_points_assists"),
    ("Steals", "player_steals"),
    ("Blks", "player_blocks"),
    ("Turnovers", "player_turnovers"),
];

/// Odds-provider market for a marketplace stat. Exact, case-sensitive.
pub fn market_for_stat(stat_type: &str) -> Option<&'static str> {
    STAT_TYPE_MAP
        .iter()
        .find(|(stat, _)| *stat == stat_type)
        .map(|(_, market)| *market)
}

pub fn stat_for_market(market: &str) -> Option<&'static str> {
    STAT_TYPE_MAP
        .iter()
        .find(|(_, m)| *m == market)
        .map(|(stat, _)| *stat)
}

/// Distinct markets needed to price `props`, sorted. Unmapped stats are ignored.
pub fn markets_needed(props: &[Prop]) -> BTreeSet<&'static str> {
    props
        .iter()
        .filter_map(|p| market_for_stat(&p.stat_type))
        .collect()
}
