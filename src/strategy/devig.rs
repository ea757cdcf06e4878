//! Odds conversion and vig removal.
//!
//! American odds → implied probability, then the power method: find the
//! exponent `k` with `p_over^k + p_under^k = 1` by Brent root-finding on
//! `[0.5, 2.0]`. Quotes whose objective has no sign change in that bracket
//! are rejected so the caller can drop them.

use roots::{find_root_brent, SimpleConvergency};

use crate::types::{FairProbabilityPair, PropEdgeError};

/// Lower bound of the exponent bracket.
pub const BRACKET_LOW: f64 = 0.5;

/// Upper bound of the exponent bracket.
pub const BRACKET_HIGH: f64 = 2.0;

const ROOT_EPS: f64 = 1e-10;
const MAX_ROOT_ITERATIONS: usize = 100;

/// Convert American odds to an implied probability.
///
/// `-145` → 0.5918, `+125` → 0.4444. Both `-100` and `+100` give 0.5.
pub fn implied_probability(american_odds: i32) -> f64 {
    if american_odds < 0 {
        let risk = f64::from(american_odds).abs();
        risk / (risk + 100.0)
    } else {
        100.0 / (f64::from(american_odds) + 100.0)
    }
}

/// Remove the vig from a two-sided quote with the power method.
pub fn devig_power(over_odds: i32, under_odds: i32) -> Result<FairProbabilityPair, PropEdgeError> {
    let ip_over = implied_probability(over_odds);
    let ip_under = implied_probability(under_odds);

    let objective = |k: f64| ip_over.powf(k) + ip_under.powf(k) - 1.0;
    let mut convergency = SimpleConvergency {
        eps: ROOT_EPS,
        max_iter: MAX_ROOT_ITERATIONS,
    };

    let k = find_root_brent(BRACKET_LOW, BRACKET_HIGH, &objective, &mut convergency).map_err(
        |e| PropEdgeError::Devig {
            over_odds,
            under_odds,
            reason: format!("{e:?}"),
        },
    )?;

    Ok(FairProbabilityPair {
        over: ip_over.powf(k),
        under: ip_under.powf(k),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    #[test]
    fn test_implied_probability_known_values() {
        assert!((implied_probability(-145) - 145.0 / 245.0).abs() < 1e-12);
        assert!((implied_probability(125) - 100.0 / 225.0).abs() < 1e-12);
        assert!((implied_probability(-110) - 0.523_809_5).abs() < 1e-6);
    }

    #[test]
    fn test_implied_probability_even_money_exact() {
        assert_eq!(implied_probability(-100), 0.5);
        assert_eq!(implied_probability(100), 0.5);
    }

    #[test]
    fn test_implied_probability_favorite_and_underdog() {
        for odds in [-101, -110, -150, -300, -1000, -25_000] {
            assert!(implied_probability(odds) > 0.5, "{odds} should be a favorite");
        }
        for odds in [101, 110, 150, 300, 1000, 25_000] {
            assert!(implied_probability(odds) < 0.5, "{odds} should be an underdog");
        }
    }

    #[test]
    fn test_devig_symmetric_is_fifty_fifty() {
        let fair = devig_power(-110, -110).unwrap();
        assert!((fair.over - 0.5).abs() < TOL);
        assert!((fair.under - 0.5).abs() < TOL);
    }

    #[test]
    fn test_devig_sums_to_one() {
        let pairs = [
            (-145, 125),
            (-140, 120),
            (-110, -110),
            (-115, -105),
            (-200, 160),
            (150, -180),
            (-300, 240),
            (-10_000, 5000),
            (100, 100),
        ];
        for (over, under) in pairs {
            let fair = devig_power(over, under).unwrap();
            assert!((fair.sum() - 1.0).abs() < TOL, "{over}/{under} sums to {}", fair.sum());
        }
    }

    #[test]
    fn test_devig_preserves_favorite() {
        let fair = devig_power(-145, 125).unwrap();
        assert!(fair.over > fair.under);
        let fair = devig_power(150, -180).unwrap();
        assert!(fair.under > fair.over);
    }

    #[test]
    fn test_devig_known_value() {
        let fair = devig_power(-145, 125).unwrap();
        assert!((fair.over - 0.57498).abs() < 1e-3, "got {}", fair.over);
    }

    #[test]
    fn test_devig_removes_margin() {
        let fair = devig_power(-120, 100).unwrap();
        assert!(fair.over < implied_probability(-120));
        assert!(fair.under < implied_probability(100));
    }

    #[test]
    fn test_devig_fails_without_bracket() {
        // Both sides heavy favorites: even k = 2 leaves the sum above 1.
        let err = devig_power(-1000, -1000).unwrap_err();
        assert!(matches!(err, PropEdgeError::Devig { over_odds: -1000, under_odds: -1000, .. }));
    }
}
