//! Sportsbook consensus.
//!
//! Sharper books carry more weight. Anything not in the table gets
//! `DEFAULT_WEIGHT`, which sits below every named book.

use crate::types::{BookProbability, PropEdgeError};

/// Fixed weights for known sportsbooks (sharpness ranking).
pub const SPORTSBOOK_WEIGHTS: &[(&str, f64)] = &[
    ("fanduel", 100.0),
    ("pinnacle", 80.0),
    ("draftkings", 60.0),
    ("betmgm", 40.0),
    ("williamhill_us", 40.0),
];

/// Weight for any sportsbook missing from `SPORTSBOOK_WEIGHTS`.
pub const DEFAULT_WEIGHT: f64 = 20.0;

/// Consensus weight for a sportsbook key.
pub fn sportsbook_weight(sportsbook: &str) -> f64 {
    SPORTSBOOK_WEIGHTS
        .iter()
        .find(|(key, _)| *key == sportsbook)
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_WEIGHT)
}

/// Weighted mean of the books' fair "over" probabilities.
///
/// The result always lies between the smallest and largest input.
pub fn build_consensus(books: &[BookProbability]) -> Result<f64, PropEdgeError> {
    if books.is_empty() {
        return Err(PropEdgeError::EmptyConsensus);
    }

    let (weighted_sum, total_weight) = books.iter().fold((0.0, 0.0), |(sum, total), book| {
        let w = sportsbook_weight(&book.sportsbook);
        (sum + w * book.fair_over, total + w)
    });

    Ok(weighted_sum / total_weight)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn book(sportsbook: &str, fair_over: f64) -> BookProbability {
        BookProbability {
            sportsbook: sportsbook.to_string(),
            fair_over,
            fair_under: 1.0 - fair_over,
        }
    }

    #[test]
    fn test_weight_table() {
        assert_eq!(sportsbook_weight("fanduel"), 100.0);
        assert_eq!(sportsbook_weight("pinnacle"), 80.0);
        assert_eq!(sportsbook_weight("draftkings"), 60.0);
        assert_eq!(sportsbook_weight("betmgm"), 40.0);
        assert_eq!(sportsbook_weight("williamhill_us"), 40.0);
        assert_eq!(sportsbook_weight("bovada"), DEFAULT_WEIGHT);
    }

    #[test]
    fn test_default_weight_below_named_books() {
        for (_, w) in SPORTSBOOK_WEIGHTS {
            assert!(DEFAULT_WEIGHT < *w);
        }
    }

    #[test]
    fn test_single_book_passthrough() {
        let c = build_consensus(&[book("bovada", 0.6123)]).unwrap();
        assert_eq!(c, 0.6123);
    }

    #[test]
    fn test_identical_values_ignore_weights() {
        let books = [book("fanduel", 0.55), book("betrivers", 0.55), book("pinnacle", 0.55)];
        let c = build_consensus(&books).unwrap();
        assert!((c - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mean() {
        let books = [book("fanduel", 0.60), book("draftkings", 0.50)];
        let c = build_consensus(&books).unwrap();
        assert!((c - 0.5625).abs() < 1e-12);
    }

    #[test]
    fn test_consensus_within_hull() {
        let books = [
            book("fanduel", 0.58),
            book("draftkings", 0.52),
            book("betmgm", 0.61),
            book("unibet_us", 0.49),
        ];
        let c = build_consensus(&books).unwrap();
        assert!((0.49..=0.61).contains(&c));
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(build_consensus(&[]), Err(PropEdgeError::EmptyConsensus)));
    }
}
