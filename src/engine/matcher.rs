//! Cross-source player identity resolution.
//!
//! The marketplace and the sportsbook feed spell players differently
//! ("P.J. Washington" vs "PJ Washington", "Jaren Jackson Jr." vs
//! "Jaren Jackson"). Resolution runs four tiers, first hit wins:
//!
//! 1. exact string match
//! 2. normalized-name equality
//! 3. manual override table
//! 4. fuzzy similarity ≥ 85 over normalized names

use std::collections::HashMap;
use std::fmt;

use rapidfuzz::fuzz;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Minimum similarity (0–100) for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 85.0;

/// Generational suffixes dropped from the end of a name.
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Canonical form used for comparison.
///
/// Lowercases, deletes periods, turns hyphens into spaces, drops trailing
/// generational suffixes and collapses whitespace. Apostrophes survive.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == '-' { ' ' } else { c })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| NAME_SUFFIXES.contains(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}

/// Indel similarity on a 0–100 scale: `100 * (1 - indel / (len_a + len_b))`.
///
/// Insertions cost less than under Levenshtein, so a short first name
/// still lands near its full form ("herb jones" vs "herbert jones" ≈ 87).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    fuzz::ratio(a.chars(), b.chars()) * 100.0
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Which resolution tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    Exact,
    Normalized,
    Override,
    Fuzzy,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact"),
            MatchTier::Normalized => write!(f, "normalized"),
            MatchTier::Override => write!(f, "override"),
            MatchTier::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// A resolved sportsbook-side player name.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMatch {
    pub name: String,
    pub tier: MatchTier,
    /// Similarity score; 100 for every tier except fuzzy.
    pub score: f64,
}

impl PlayerMatch {
    fn certain(name: &str, tier: MatchTier) -> Self {
        Self {
            name: name.to_string(),
            tier,
            score: 100.0,
        }
    }
}

/// Resolve a marketplace name against the sportsbook names seen for a market.
///
/// Fuzzy ties keep the first candidate in `candidates` order, so callers
/// should pass a sorted list. `None` means the prop should be skipped.
pub fn match_player(
    source_name: &str,
    candidates: &[String],
    overrides: &HashMap<String, String>,
) -> Option<PlayerMatch> {
    if candidates.iter().any(|c| c == source_name) {
        return Some(PlayerMatch::certain(source_name, MatchTier::Exact));
    }

    let source_norm = normalize_name(source_name);
    let normalized: Vec<String> = candidates.iter().map(|c| normalize_name(c)).collect();

    if let Some(i) = normalized.iter().position(|n| *n == source_norm) {
        return Some(PlayerMatch::certain(&candidates[i], MatchTier::Normalized));
    }

    if let Some(target) = overrides.get(source_name) {
        if candidates.contains(target) {
            return Some(PlayerMatch::certain(target, MatchTier::Override));
        }
    }

    let mut best: Option<PlayerMatch> = None;
    let mut best_score = 0.0;
    for (candidate, candidate_norm) in candidates.iter().zip(&normalized) {
        let score = similarity_ratio(&source_norm, candidate_norm);
        if score > best_score && score >= FUZZY_THRESHOLD {
            best_score = score;
            best = Some(PlayerMatch {
                name: candidate.clone(),
                tier: MatchTier::Fuzzy,
                score,
            });
        }
    }

    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
