//! Sportsbook quote grouping.
//!
//! Flattens per-event bookmaker payloads into two-sided quotes keyed by
//! (player, market, line).

use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;

use crate::types::{EventOdds, QuoteKey, SportsbookQuote};

/// Accumulated quotes for one scan.
#[derive(Debug, Default, Clone)]
pub struct QuoteBook {
    groups: BTreeMap<QuoteKey, Vec<SportsbookQuote>>,
}

/// Over and under prices seen for one player line within a book's market.
#[derive(Default)]
struct SidePair {
    over: Option<i32>,
    under: Option<i32>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair each bookmaker's over/under outcomes and add them to the book.
    ///
    /// Returns how many quotes were added. One-sided lines and outcomes
    /// without a point are skipped.
    pub fn ingest(&mut self, odds: &EventOdds) -> usize {
        let mut added = 0;

        for bookmaker in &odds.bookmakers {
            for market in &bookmaker.markets {
                let mut pairs: BTreeMap<(String, OrderedFloat<f64>), SidePair> = BTreeMap::new();

                for outcome in &market.outcomes {
                    let Some(point) = outcome.point else {
                        continue;
                    };
                    let price = outcome.price.round() as i32;
                    let entry = pairs
                        .entry((outcome.player_name.clone(), OrderedFloat(point)))
                        .or_default();
                    match outcome.side.to_lowercase().as_str() {
                        "over" => entry.over = Some(price),
                        "under" => entry.under = Some(price),
                        _ => {}
                    }
                }

                for ((player, line), sides) in pairs {
                    let (Some(over_odds), Some(under_odds)) = (sides.over, sides.under) else {
                        continue;
                    };
                    self.insert(
                        QuoteKey {
                            player,
                            market: market.key.clone(),
                            line,
                        },
                        SportsbookQuote {
                            sportsbook: bookmaker.key.clone(),
                            market: market.key.clone(),
                            line: line.into_inner(),
                            over_odds,
                            under_odds,
                        },
                    );
                    added += 1;
                }
            }
        }

        added
    }

    pub fn insert(&mut self, key: QuoteKey, quote: SportsbookQuote) {
        self.groups.entry(key).or_default().push(quote);
    }

    /// Fold another book into this one. Quote lists are concatenated.
    pub fn merge(&mut self, other: QuoteBook) {
        for (key, quotes) in other.groups {
            self.groups.entry(key).or_default().extend(quotes);
        }
    }

    pub fn get(&self, key: &QuoteKey) -> Option<&[SportsbookQuote]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Sorted sportsbook-side player names for each market.
    pub fn players_by_market(&self) -> BTreeMap<String, Vec<String>> {
        let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for key in self.groups.keys() {
            sets.entry(key.market.clone())
                .or_default()
                .insert(key.player.clone());
        }
        sets.into_iter()
            .map(|(market, players)| (market, players.into_iter().collect()))
            .collect()
    }

    /// Number of (player, market, line) groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn quote_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BookMarket, Bookmaker, Outcome};

    fn outcome(player: &str, side: &str, price: f64, point: Option<f64>) -> Outcome {
        Outcome {
            player_name: player.to_string(),
            side: side.to_string(),
            price,
            point,
        }
    }

    fn odds(book: &str, market: &str, outcomes: Vec<Outcome>) -> EventOdds {
        EventOdds {
            bookmakers: vec![Bookmaker {
                key: book.to_string(),
                markets: vec![BookMarket {
                    key: market.to_string(),
                    outcomes,
                }],
            }],
        }
    }

    #[test]
    fn test_ingest_pairs_sides() {
        let mut book = QuoteBook::new();
        let added = book.ingest(&odds(
            "fanduel",
            "player_points",
            vec![
                outcome("LeBron James", "Over", -145.0, Some(24.5)),
                outcome("LeBron James", "Under", 125.0, Some(24.5)),
            ],
        ));
        assert_eq!(added, 1);

        let quotes = book.get(&QuoteKey::new("LeBron James", "player_points", 24.5)).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].sportsbook, "fanduel");
        assert_eq!(quotes[0].over_odds, -145);
        assert_eq!(quotes[0].under_odds, 125);
    }

    #[test]
    fn test_one_sided_and_pointless_skipped() {
        let mut book = QuoteBook::new();
        let added = book.ingest(&odds(
            "draftkings",
            "player_rebounds",
            vec![
                outcome("Anthony Davis", "Over", -120.0, Some(11.5)),
                outcome("Rui Hachimura", "Over", -110.0, None),
                outcome("Rui Hachimura", "Under", -110.0, None),
            ],
        ));
        assert_eq!(added, 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_alternate_lines_kept_apart() {
        let mut book = QuoteBook::new();
        book.ingest(&odds(
            "fanduel",
            "player_points",
            vec![
                outcome("Luka Doncic", "Over", -110.0, Some(32.5)),
                outcome("Luka Doncic", "Under", -110.0, Some(32.5)),
                outcome("Luka Doncic", "Over", 120.0, Some(34.5)),
                outcome("Luka Doncic", "Under", -150.0, Some(34.5)),
            ],
        ));
        assert_eq!(book.len(), 2);
        let alt = book.get(&QuoteKey::new("Luka Doncic", "player_points", 34.5)).unwrap();
        assert_eq!(alt[0].over_odds, 120);
        assert!(book.get(&QuoteKey::new("Luka Doncic", "player_points", 33.5)).is_none());
    }

    #[test]
    fn test_merge_concatenates_books() {
        let mut a = QuoteBook::new();
        a.ingest(&odds(
            "fanduel",
            "player_points",
            vec![
                outcome("LeBron James", "Over", -145.0, Some(24.5)),
                outcome("LeBron James", "Under", 125.0, Some(24.5)),
            ],
        ));
        let mut b = QuoteBook::new();
        b.ingest(&odds(
            "draftkings",
            "player_points",
            vec![
                outcome("LeBron James", "Under", 120.0, Some(24.5)),
                outcome("LeBron James", "Over", -140.0, Some(24.5)),
            ],
        ));
        a.merge(b);

        let quotes = a.get(&QuoteKey::new("LeBron James", "player_points", 24.5)).unwrap();
        let books: Vec<&str> = quotes.iter().map(|q| q.sportsbook.as_str()).collect();
        assert_eq!(books, vec!["fanduel", "draftkings"]);
        assert_eq!(a.quote_count(), 2);
    }

    #[test]
    fn test_players_by_market_sorted() {
        let mut book = QuoteBook::new();
        for player in ["Zach LaVine", "Anthony Davis", "Mikal Bridges"] {
            book.insert(
                QuoteKey::new(player, "player_points", 20.5),
                SportsbookQuote {
                    sportsbook: "fanduel".into(),
                    market: "player_points".into(),
                    line: 20.5,
                    over_odds: -110,
                    under_odds: -110,
                },
            );
        }
        book.insert(
            QuoteKey::new("Anthony Davis", "player_points", 21.5),
            SportsbookQuote {
                sportsbook: "fanduel".into(),
                market: "player_points".into(),
                line: 21.5,
                over_odds: -110,
                under_odds: -110,
            },
        );

        let by_market = book.players_by_market();
        assert_eq!(
            by_market["player_points"],
            vec!["Anthony Davis", "Mikal Bridges", "Zach LaVine"]
        );
    }
}
