//! Edge scoring against fixed-payout break-even rates.
//!
//! Each payout structure needs a minimum per-leg win probability to be
//! profitable. Edge is the consensus probability minus that threshold.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::types::{EdgeQuality, PropEdgeError, Side};

// ---------------------------------------------------------------------------
// Payout structures
// ---------------------------------------------------------------------------

/// Per-leg break-even win probability for each payout structure.
pub const BREAKEVEN_THRESHOLDS: &[(&str, f64)] = &[
    ("2-pick-power", 0.577),
    ("3-pick-power", 0.585),
    ("4-pick-flex", 0.550),
    ("5-pick-flex", 0.542),
    ("6-pick-flex", 0.542),
];

/// Structure used when the caller doesn't pick one (the largest entry).
pub const DEFAULT_PAYOUT_STRUCTURE: &str = "6-pick-flex";

/// Fixed-odds multi-leg entry format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PayoutStructure {
    TwoPickPower,
    ThreePickPower,
    FourPickFlex,
    FivePickFlex,
    #[default]
    SixPickFlex,
}

impl PayoutStructure {
    pub const ALL: &'static [PayoutStructure] = &[
        PayoutStructure::TwoPickPower,
        PayoutStructure::ThreePickPower,
        PayoutStructure::FourPickFlex,
        PayoutStructure::FivePickFlex,
        PayoutStructure::SixPickFlex,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            PayoutStructure::TwoPickPower => "2-pick-power",
            PayoutStructure::ThreePickPower => "3-pick-power",
            PayoutStructure::FourPickFlex => "4-pick-flex",
            PayoutStructure::FivePickFlex => "5-pick-flex",
            PayoutStructure::SixPickFlex => "6-pick-flex",
        }
    }

    /// Minimum per-leg win probability. `BREAKEVEN_THRESHOLDS` is laid out
    /// in declaration order.
    pub fn breakeven(&self) -> f64 {
        BREAKEVEN_THRESHOLDS[*self as usize].1
    }
}

impl fmt::Display for PayoutStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PayoutStructure {
    type Err = PropEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayoutStructure::ALL
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| PropEdgeError::UnknownPayoutStructure(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Edge calculation
// ---------------------------------------------------------------------------

/// `fair_prob` minus the structure's break-even rate.
///
/// An unknown structure id is a configuration bug and is returned as an error.
pub fn calculate_edge(fair_prob: f64, structure_id: &str) -> Result<f64, PropEdgeError> {
    let structure: PayoutStructure = structure_id.parse()?;
    Ok(fair_prob - structure.breakeven())
}

/// Map an edge to its quality label. Lower bounds are inclusive.
pub fn classify_edge(edge: f64) -> EdgeQuality {
    if edge >= 0.05 {
        EdgeQuality::Excellent
    } else if edge >= 0.03 {
        EdgeQuality::VeryGood
    } else if edge >= 0.02 {
        EdgeQuality::Good
    } else if edge >= 0.01 {
        EdgeQuality::Marginal
    } else {
        EdgeQuality::Noise
    }
}

/// Inclusive minimum-edge filter.
pub fn meets_minimum(edge: f64, min_edge: f64) -> bool {
    edge >= min_edge
}

/// The better side of a prop, with its edge and probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideSelection {
    pub side: Side,
    pub edge: f64,
    pub probability: f64,
    pub quality: EdgeQuality,
}

/// Score both sides of a consensus and keep the higher edge. Ties go to over.
pub fn select_side(consensus_over: f64, structure_id: &str) -> Result<SideSelection, PropEdgeError> {
    let consensus_under = 1.0 - consensus_over;
    let edge_over = calculate_edge(consensus_over, structure_id)?;
    let edge_under = calculate_edge(consensus_under, structure_id)?;

    let (side, edge, probability) = if edge_over >= edge_under {
        (Side::Over, edge_over, consensus_over)
    } else {
        (Side::Under, edge_under, consensus_under)
    };

    debug!(
        structure = structure_id,
        edge_over = format!("{:+.2}%", edge_over * 100.0),
        edge_under = format!("{:+.2}%", edge_under * 100.0),
        side = %side,
        "Sides scored"
    );

    Ok(SideSelection {
        side,
        edge,
        probability,
        quality: classify_edge(edge),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
