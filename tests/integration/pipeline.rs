//! Full scan pipeline: props → events → odds → match → devig → rank.

use std::sync::Arc;

use secrecy::SecretString;

use propedge::config::OddsApiConfig;
use propedge::data::cache::MemoryCache;
use propedge::data::odds_api::{events_cache_key, props_cache_key, OddsApiClient};
use propedge::data::ResponseCache;
use propedge::engine::scanner::{EvScanner, ScannerConfig};
use propedge::storage::{BetResult, Database};
use propedge::types::*;

use crate::mock_sources::*;

fn lebron_points() -> Vec<Line<'static>> {
    vec![
        Line { book: "fanduel", market: "player_points", player: "LeBron James", point: 24.5, over: -145.0, under: 125.0 },
        Line { book: "draftkings", market: "player_points", player: "LeBron James", point: 24.5, over: -140.0, under: 120.0 },
    ]
}

fn davis_rebounds() -> Line<'static> {
    Line { book: "fanduel", market: "player_rebounds", player: "Anthony Davis", point: 11.5, over: 130.0, under: -155.0 }
}

fn scanner(props: MockProps, odds: MockOdds) -> EvScanner {
    EvScanner::new(
        Arc::new(props),
        Arc::new(odds),
        Arc::new(MockOverrides::none()),
        ScannerConfig::default(),
    )
}

#[tokio::test]
async fn test_two_book_consensus_end_to_end() {
    let props = MockProps::new(vec![prop("LeBron James", "Points", 24.5)]);
    let odds = MockOdds::new().with_event(event("e1", "Los Angeles Lakers", "Boston Celtics"), event_odds(&lebron_points()));

    let report = scanner(props, odds).scan("nba", 0.02).await.unwrap();

    assert_eq!(report.league, "NBA");
    assert_eq!(report.markets_requested, vec!["player_points"]);
    assert_eq!(report.credits_remaining, Some(500));
    assert!(report.reason.is_none());
    assert_eq!(report.opportunities.len(), 1);

    let opp = &report.opportunities[0];
    assert_eq!(opp.recommended_side, Side::Over);
    assert_eq!(opp.quality, EdgeQuality::Good);
    assert_eq!(opp.books_used, vec!["fanduel", "draftkings"]);
    assert!((opp.fair_prob_over - 0.5714).abs() < 0.002);
    assert!((opp.fair_prob_over + opp.fair_prob_under - 1.0).abs() < 1e-9);
    assert!((opp.edge - 0.0294).abs() < 0.002);
}

#[tokio::test]
async fn test_ranked_across_events_with_under_pick() {
    let props = MockProps::new(vec![
        prop("LeBron James", "Points", 24.5),
        prop("Anthony Davis", "Rebounds", 11.5),
        prop("Anthony Davis", "Fantasy Score", 48.0),
    ]);
    let odds = MockOdds::new()
        .with_event(event("e1", "Los Angeles Lakers", "Boston Celtics"), event_odds(&lebron_points()))
        .with_event(event("e2", "Los Angeles Lakers", "Denver Nuggets"), event_odds(&[davis_rebounds()]));

    let report = scanner(props, odds).scan("NBA", 0.02).await.unwrap();

    assert_eq!(report.props_fetched, 3);
    assert_eq!(report.players_matched, 2);
    assert_eq!(report.opportunities.len(), 2);

    let best = &report.opportunities[0];
    assert_eq!(best.player_name, "Anthony Davis");
    assert_eq!(best.recommended_side, Side::Under);
    assert_eq!(best.quality, EdgeQuality::VeryGood);
    assert!((best.fair_prob_under - 0.5883).abs() < 0.002);
    assert!(report.opportunities[0].edge >= report.opportunities[1].edge);
    assert_eq!(report.best_edge(), Some(best.edge));
}

#[tokio::test]
async fn test_failed_event_is_skipped() {
    let props = MockProps::new(vec![prop("LeBron James", "Points", 24.5)]);
    let odds = MockOdds::new()
        .with_failing_event(event("e0", "New York Knicks", "Miami Heat"))
        .with_event(event("e1", "Los Angeles Lakers", "Boston Celtics"), event_odds(&lebron_points()));

    let report = scanner(props, odds).scan("NBA", 0.02).await.unwrap();

    assert_eq!(report.events_found, 2);
    assert_eq!(report.events_failed, 1);
    assert_eq!(report.opportunities.len(), 1);
}

#[tokio::test]
async fn test_props_failure_is_reported_not_raised() {
    let props = MockProps::new(Vec::new());
    props.set_error("403 Forbidden");

    let report = scanner(props, MockOdds::new()).scan("NBA", 0.02).await.unwrap();

    assert!(report.is_empty());
    let reason = report.reason.unwrap();
    assert!(reason.starts_with("Props fetch failed"), "{reason}");
    assert!(reason.contains("403 Forbidden"));
}

#[tokio::test]
async fn test_high_threshold_explains_empty_result() {
    let props = MockProps::new(vec![prop("LeBron James", "Points", 24.5)]);
    let odds = MockOdds::new().with_event(event("e1", "Los Angeles Lakers", "Boston Celtics"), event_odds(&lebron_points()));

    let report = scanner(props, odds).scan("NBA", 0.10).await.unwrap();

    assert_eq!(report.props_priced, 1);
    assert!(report.is_empty());
    assert_eq!(report.reason.as_deref(), Some("No opportunities found with edge >= 10.0%"));
}

#[tokio::test]
async fn test_unknown_payout_structure_is_an_error() {
    let props = MockProps::new(vec![prop("LeBron James", "Points", 24.5)]);
    let s = EvScanner::new(
        Arc::new(props),
        Arc::new(MockOdds::new()),
        Arc::new(MockOverrides::none()),
        ScannerConfig {
            payout_structure: "7-pick-flex".to_string(),
            ..ScannerConfig::default()
        },
    );
    assert!(matches!(
        s.scan("NBA", 0.02).await,
        Err(PropEdgeError::UnknownPayoutStructure(_))
    ));
}

#[tokio::test]
async fn test_database_override_and_persistence() {
    let db = Database::in_memory().await.unwrap();
    db.save_override("Nic Claxton", "Nicolas Claxton", "basketball_nba").await.unwrap();

    let props = MockProps::new(vec![prop("Nic Claxton", "Rebounds", 8.5)]);
    let odds = MockOdds::new().with_event(
        event("e1", "Brooklyn Nets", "Boston Celtics"),
        event_odds(&[Line { book: "pinnacle", market: "player_rebounds", player: "Nicolas Claxton", point: 8.5, over: 130.0, under: -155.0 }]),
    );
    let s = EvScanner::new(
        Arc::new(props),
        Arc::new(odds),
        Arc::new(db.clone()),
        ScannerConfig::default(),
    );

    let report = s.scan("NBA", 0.02).await.unwrap();
    assert_eq!(report.players_matched, 1);
    assert_eq!(report.opportunities.len(), 1);
    // Reported under the marketplace spelling.
    assert_eq!(report.opportunities[0].player_name, "Nic Claxton");

    let id = db.save_opportunity(&report.opportunities[0]).await.unwrap();
    let pending = db.pending_opportunities().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].recommended_side, "under");
    assert_eq!(pending[0].books_used, vec!["pinnacle"]);

    assert!(db.update_result(id, BetResult::Hit, Some(7.0)).await.unwrap());
    assert!(db.pending_opportunities().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_odds_client_served_from_cache() {
    let cache = Arc::new(MemoryCache::new());
    let events = vec![
        event("e1", "Los Angeles Lakers", "Boston Celtics"),
        event("e2", "Golden State Warriors", "Phoenix Suns"),
    ];
    let markets = vec!["player_points".to_string()];
    let ttl = chrono::Duration::minutes(30);

    cache
        .set(&events_cache_key("basketball_nba"), &serde_json::to_value(&events).unwrap(), ttl)
        .await
        .unwrap();
    cache
        .set(
            &props_cache_key("basketball_nba", "e1", &markets),
            &serde_json::to_value(event_odds(&lebron_points())).unwrap(),
            ttl,
        )
        .await
        .unwrap();

    // Nothing listens here, so the uncached event fails fast.
    let config = OddsApiConfig {
        base_url: "http://127.0.0.1:9/v4".to_string(),
        ..OddsApiConfig::default()
    };
    let client = OddsApiClient::new(&config, SecretString::new("test-key".to_string()), cache, ttl).unwrap();

    let s = EvScanner::new(
        Arc::new(MockProps::new(vec![prop("LeBron James", "Points", 24.5)])),
        Arc::new(client),
        Arc::new(MockOverrides::none()),
        ScannerConfig::default(),
    );
    let report = s.scan("NBA", 0.02).await.unwrap();

    assert_eq!(report.events_found, 2);
    assert_eq!(report.events_failed, 1);
    assert_eq!(report.credits_remaining, None);
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.opportunities[0].recommended_side, Side::Over);
}
