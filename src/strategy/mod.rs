//! Strategy engine: devig, consensus and edge scoring.

pub mod consensus;
pub mod devig;
pub mod edge;

use tracing::debug;

use crate::types::{BookProbability, EdgeQuality, PropEdgeError, Side, SportsbookQuote};
use consensus::build_consensus;
use devig::devig_power;
use edge::select_side;

// ---------------------------------------------------------------------------
// Priced prop
// ---------------------------------------------------------------------------

/// Consensus pricing of one (player, market, line) group.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedProp {
    /// Books whose quotes survived devigging, in input order.
    pub books: Vec<BookProbability>,
    pub consensus_over: f64,
    pub consensus_under: f64,
    pub side: Side,
    pub edge: f64,
    pub quality: EdgeQuality,
}

impl PricedProp {
    pub fn sportsbooks(&self) -> Vec<String> {
        self.books.iter().map(|b| b.sportsbook.clone()).collect()
    }
}

/// Devig every quote, build the weighted consensus and score both sides.
///
/// Quotes that fail to devig are dropped. Returns `Ok(None)` when none
/// survive. Unknown payout structures are returned as errors.
pub fn price_quotes(
    quotes: &[SportsbookQuote],
    structure_id: &str,
) -> Result<Option<PricedProp>, PropEdgeError> {
    let books: Vec<BookProbability> = quotes
        .iter()
        .filter_map(|q| match devig_power(q.over_odds, q.under_odds) {
            Ok(fair) => Some(BookProbability {
                sportsbook: q.sportsbook.clone(),
                fair_over: fair.over,
                fair_under: fair.under,
            }),
            Err(e) => {
                debug!(quote = %q, error = %e, "Dropping quote");
                None
            }
        })
        .collect();

    if books.is_empty() {
        return Ok(None);
    }

    let consensus_over = build_consensus(&books)?;
    let selection = select_side(consensus_over, structure_id)?;

    Ok(Some(PricedProp {
        books,
        consensus_over,
        consensus_under: 1.0 - consensus_over,
        side: selection.side,
        edge: selection.edge,
        quality: selection.quality,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
