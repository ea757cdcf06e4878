//! +EV scan orchestrator.
//!
//! One scan walks: fetch props → derive markets → fetch events → fetch
//! per-event odds (bounded concurrency) → group quotes → match and price
//! each prop → filter by minimum edge → rank.
//!
//! Environmental failures never abort with an error. They end the scan
//! early with a `reason` on the report, or (for a single event) are
//! counted and skipped. Only configuration bugs surface as `Err`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::matcher::match_player;
use super::quotes::QuoteBook;
use crate::data::markets::{self, market_for_stat, markets_needed, stat_for_market};
use crate::data::{OddsSource, OverrideStore, PropsSource};
use crate::strategy::edge::{meets_minimum, PayoutStructure, DEFAULT_PAYOUT_STRUCTURE};
use crate::strategy::price_quotes;
use crate::types::{Event, Opportunity, Prop, PropEdgeError, QuoteKey, ScanReport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub payout_structure: String,
    /// Maximum in-flight per-event odds requests.
    pub event_concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            payout_structure: DEFAULT_PAYOUT_STRUCTURE.to_string(),
            event_concurrency: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct EvScanner {
    props: Arc<dyn PropsSource>,
    odds: Arc<dyn OddsSource>,
    overrides: Arc<dyn OverrideStore>,
    config: ScannerConfig,
}

impl EvScanner {
    pub fn new(
        props: Arc<dyn PropsSource>,
        odds: Arc<dyn OddsSource>,
        overrides: Arc<dyn OverrideStore>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            props,
            odds,
            overrides,
            config,
        }
    }

    /// Run one scan for `league` and return opportunities whose edge is at
    /// least `min_edge`, best first.
    pub async fn scan(&self, league: &str, min_edge: f64) -> Result<ScanReport, PropEdgeError> {
        let structure: PayoutStructure = self.config.payout_structure.parse()?;
        let mut report = ScanReport::new(league, min_edge);

        let league = match markets::league(league) {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "Scan requested for unknown league");
                return Ok(report.finish_with_reason(e.to_string()));
            }
        };
        report.league = league.name.to_string();
        let sport_key = league.odds_api_sport_key;

        info!(
            league = league.name,
            structure = %structure,
            min_edge = format!("{:.1}%", min_edge * 100.0),
            "Starting +EV scan"
        );

        // -- Props -------------------------------------------------------
        let props: Vec<Prop> = match self.props.fetch_props(league.prizepicks_league_id).await {
            Ok(props) => props.into_iter().filter(Prop::is_standard).collect(),
            Err(e) => {
                error!(league = league.name, error = %e, "Props fetch failed");
                return Ok(report.finish_with_reason(format!("Props fetch failed: {e}")));
            }
        };
        report.props_fetched = props.len();
        if props.is_empty() {
            return Ok(report.finish_with_reason(format!("No props posted for {}", league.name)));
        }

        // -- Markets -----------------------------------------------------
        let market_keys: Vec<String> = markets_needed(&props)
            .into_iter()
            .map(String::from)
            .collect();
        report.markets_requested = market_keys.clone();
        if market_keys.is_empty() {
            return Ok(report.finish_with_reason(format!(
                "None of the {} props have a mapped sportsbook market",
                props.len()
            )));
        }

        // -- Events ------------------------------------------------------
        let events = match self.odds.fetch_events(sport_key).await {
            Ok(events) => events,
            Err(e) => {
                warn!(sport = sport_key, error = %e, "Events fetch failed");
                report.credits_remaining = self.odds.remaining_credits();
                return Ok(report.finish_with_reason(format!("Events fetch failed: {e}")));
            }
        };
        report.events_found = events.len();
        if events.is_empty() {
            report.credits_remaining = self.odds.remaining_credits();
            return Ok(report.finish_with_reason(format!("No upcoming events for {sport_key}")));
        }

        info!(
            props = props.len(),
            markets = market_keys.len(),
            events = events.len(),
            "Fetching sportsbook odds"
        );

        // -- Odds --------------------------------------------------------
        let (book, failed) = self.collect_quotes(sport_key, &events, &market_keys).await;
        report.events_failed = failed;
        report.credits_remaining = self.odds.remaining_credits();

        info!(
            groups = book.len(),
            quotes = book.quote_count(),
            events_failed = failed,
            credits_remaining = ?report.credits_remaining,
            "Sportsbook quotes grouped"
        );

        // -- Overrides ---------------------------------------------------
        let overrides = match self.overrides.load_overrides(sport_key).await {
            Ok(map) => map,
            Err(e) => {
                warn!(sport = sport_key, error = %e, "Override store unavailable, continuing without overrides");
                HashMap::new()
            }
        };

        // -- Match & score -----------------------------------------------
        let candidates = book.players_by_market();
        let mut opportunities = Vec::new();

        for prop in &props {
            let Some(market) = market_for_stat(&prop.stat_type) else {
                debug!(prop = %prop, "Unmapped stat type");
                continue;
            };
            let Some(names) = candidates.get(market) else {
                debug!(
                    prop = %prop,
                    market,
                    category = stat_for_market(market).unwrap_or(market),
                    "No sportsbook quotes for market"
                );
                continue;
            };
            let Some(player) = match_player(&prop.player_name, names, &overrides) else {
                debug!(prop = %prop, "No sportsbook player match");
                continue;
            };
            report.players_matched += 1;

            let key = QuoteKey::new(player.name.as_str(), market, prop.line);
            let Some(quotes) = book.get(&key) else {
                debug!(prop = %prop, matched = %player.name, "No sportsbook quotes at this line");
                continue;
            };
            let Some(priced) = price_quotes(quotes, structure.id())? else {
                debug!(prop = %prop, "Every quote failed to devig");
                continue;
            };
            report.props_priced += 1;

            if !meets_minimum(priced.edge, min_edge) {
                continue;
            }

            debug!(
                prop = %prop,
                matched = %player.name,
                tier = %player.tier,
                side = %priced.side,
                edge = format!("{:+.2}%", priced.edge * 100.0),
                "+EV prop found"
            );

            opportunities.push(Opportunity {
                player_name: prop.player_name.clone(),
                stat_type: prop.stat_type.clone(),
                league: league.name.to_string(),
                line: prop.line,
                fair_prob_over: priced.consensus_over,
                fair_prob_under: priced.consensus_under,
                recommended_side: priced.side,
                edge: priced.edge,
                num_books: priced.books.len(),
                books_used: priced.sportsbooks(),
                quality: priced.quality,
                game_time: prop.start_time,
                found_at: Utc::now(),
            });
        }

        // -- Rank --------------------------------------------------------
        opportunities.sort_by(|a, b| b.edge.total_cmp(&a.edge));
        report.opportunities = opportunities;
        report.finished_at = Utc::now();

        if report.is_empty() {
            report.reason = Some(format!(
                "No opportunities found with edge >= {:.1}%",
                min_edge * 100.0
            ));
        }

        info!(
            matched = report.players_matched,
            priced = report.props_priced,
            found = report.opportunities.len(),
            best_edge = ?report.best_edge(),
            "Scan complete"
        );

        Ok(report)
    }

    /// Fetch every event's odds with bounded concurrency. Each event is
    /// grouped into its own book, then the books are merged in event order.
    async fn collect_quotes(
        &self,
        sport_key: &str,
        events: &[Event],
        markets: &[String],
    ) -> (QuoteBook, usize) {
        let concurrency = self.config.event_concurrency.max(1);

        let results: Vec<(&Event, anyhow::Result<QuoteBook>)> = stream::iter(events)
            .map(|event| async move {
                let result = self
                    .odds
                    .fetch_event_odds(sport_key, &event.id, markets)
                    .await
                    .map(|odds| {
                        let mut book = QuoteBook::new();
                        book.ingest(&odds);
                        book
                    });
                (event, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut merged = QuoteBook::new();
        let mut failed = 0;
        for (event, result) in results {
            match result {
                Ok(book) => {
                    debug!(event_id = %event.id, groups = book.len(), "Event odds ingested");
                    merged.merge(book);
                }
                Err(e) => {
                    warn!(event_id = %event.id, matchup = %event, error = %e, "Odds fetch failed, skipping event");
                    failed += 1;
                }
            }
        }

        (merged, failed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
