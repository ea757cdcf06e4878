//! In-memory data sources for integration testing.
//!
//! Deterministic `PropsSource`, `OddsSource` and `OverrideStore`
//! implementations whose contents and failures are fully controllable
//! from test code.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use propedge::data::{OddsSource, OverrideStore, PropsSource};
use propedge::types::*;

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn prop(player: &str, stat: &str, line: f64) -> Prop {
    Prop {
        player_name: player.to_string(),
        team: "LAL".to_string(),
        stat_type: stat.to_string(),
        line,
        start_time: None,
        odds_type: "standard".to_string(),
    }
}

pub fn event(id: &str, home: &str, away: &str) -> Event {
    Event {
        id: id.to_string(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        commence_time: None,
    }
}

/// One two-sided line as a bookmaker prices it.
pub struct Line<'a> {
    pub book: &'a str,
    pub market: &'a str,
    pub player: &'a str,
    pub point: f64,
    pub over: f64,
    pub under: f64,
}

/// Assemble a provider payload, grouping lines by bookmaker then market.
pub fn event_odds(lines: &[Line<'_>]) -> EventOdds {
    let mut bookmakers: Vec<Bookmaker> = Vec::new();
    for line in lines {
        let outcomes = [("Over", line.over), ("Under", line.under)].map(|(side, price)| Outcome {
            player_name: line.player.to_string(),
            side: side.to_string(),
            price,
            point: Some(line.point),
        });

        let bookmaker = match bookmakers.iter().position(|b| b.key == line.book) {
            Some(i) => &mut bookmakers[i],
            None => {
                bookmakers.push(Bookmaker {
                    key: line.book.to_string(),
                    markets: Vec::new(),
                });
                let last = bookmakers.len() - 1;
                &mut bookmakers[last]
            }
        };
        match bookmaker.markets.iter_mut().find(|m| m.key == line.market) {
            Some(market) => market.outcomes.extend(outcomes),
            None => bookmaker.markets.push(BookMarket {
                key: line.market.to_string(),
                outcomes: outcomes.to_vec(),
            }),
        }
    }
    EventOdds { bookmakers }
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

pub struct MockProps {
    props: Vec<Prop>,
    /// If set, every fetch returns this error.
    force_error: Mutex<Option<String>>,
}

impl MockProps {
    pub fn new(props: Vec<Prop>) -> Self {
        Self {
            props,
            force_error: Mutex::new(None),
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }
}

#[async_trait]
impl PropsSource for MockProps {
    async fn fetch_props(&self, _league_id: &str) -> Result<Vec<Prop>> {
        if let Some(msg) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{msg}"));
        }
        Ok(self.props.clone())
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

pub struct MockOdds {
    events: Vec<Event>,
    odds: HashMap<String, EventOdds>,
    failing_events: HashSet<String>,
    credits: Option<u64>,
    /// Event ids in the order their odds were requested.
    requested: Mutex<Vec<String>>,
}

impl MockOdds {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            odds: HashMap::new(),
            failing_events: HashSet::new(),
            credits: Some(500),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_event(mut self, event: Event, odds: EventOdds) -> Self {
        self.odds.insert(event.id.clone(), odds);
        self.events.push(event);
        self
    }

    /// An event that is listed but whose odds request fails.
    pub fn with_failing_event(mut self, event: Event) -> Self {
        self.failing_events.insert(event.id.clone());
        self.events.push(event);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl OddsSource for MockOdds {
    async fn fetch_events(&self, _sport_key: &str) -> Result<Vec<Event>> {
        Ok(self.events.clone())
    }

    async fn fetch_event_odds(
        &self,
        _sport_key: &str,
        event_id: &str,
        _markets: &[String],
    ) -> Result<EventOdds> {
        self.requested.lock().unwrap().push(event_id.to_string());
        if self.failing_events.contains(event_id) {
            return Err(anyhow!("The-Odds-API error 503 Service Unavailable: upstream timeout"));
        }
        self.odds
            .get(event_id)
            .cloned()
            .ok_or_else(|| anyhow!("No odds for event {event_id}"))
    }

    fn remaining_credits(&self) -> Option<u64> {
        self.credits
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockOverrides {
    by_scope: HashMap<String, HashMap<String, String>>,
}

impl MockOverrides {
    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OverrideStore for MockOverrides {
    async fn load_overrides(&self, scope: &str) -> Result<HashMap<String, String>> {
        Ok(self.by_scope.get(scope).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_odds_groups_by_book_and_market() {
        let odds = event_odds(&[
            Line { book: "fanduel", market: "player_points", player: "A", point: 20.5, over: -110.0, under: -110.0 },
            Line { book: "fanduel", market: "player_points", player: "B", point: 10.5, over: -120.0, under: 100.0 },
            Line { book: "fanduel", market: "player_rebounds", player: "A", point: 8.5, over: 105.0, under: -125.0 },
            Line { book: "draftkings", market: "player_points", player: "A", point: 20.5, over: -115.0, under: -105.0 },
        ]);
        assert_eq!(odds.bookmakers.len(), 2);
        assert_eq!(odds.bookmakers[0].markets.len(), 2);
        assert_eq!(odds.bookmakers[0].markets[0].outcomes.len(), 4);
        assert_eq!(odds.bookmakers[1].markets[0].outcomes[1].side, "Under");
    }

    #[tokio::test]
    async fn test_mock_props_forced_error() {
        let source = MockProps::new(vec![prop("LeBron James", "Points", 24.5)]);
        assert_eq!(source.fetch_props("7").await.unwrap().len(), 1);
        source.set_error("connection reset");
        assert!(source.fetch_props("7").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_odds_failing_event() {
        let odds = MockOdds::new()
            .with_event(event("e1", "Lakers", "Celtics"), EventOdds::default())
            .with_failing_event(event("e2", "Knicks", "Heat"));
        assert_eq!(odds.fetch_events("basketball_nba").await.unwrap().len(), 2);
        assert!(odds.fetch_event_odds("basketball_nba", "e1", &[]).await.is_ok());
        assert!(odds.fetch_event_odds("basketball_nba", "e2", &[]).await.is_err());
        assert_eq!(odds.requested(), vec!["e1", "e2"]);
    }
}
