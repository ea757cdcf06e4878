//! External data sources.
//!
//! The scanner only sees these traits; the HTTP clients and the SQLite
//! store implement them, and tests swap in mocks.

pub mod cache;
pub mod markets;
pub mod odds_api;
pub mod prizepicks;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Event, EventOdds, Prop};

/// Source of fixed-payout marketplace props.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PropsSource: Send + Sync {
    /// Standard props currently posted for a marketplace league id.
    async fn fetch_props(&self, league_id: &str) -> Result<Vec<Prop>>;
}

/// Source of sportsbook events and per-event player-prop odds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsSource: Send + Sync {
    async fn fetch_events(&self, sport_key: &str) -> Result<Vec<Event>>;

    /// All requested markets for one event, in one request.
    async fn fetch_event_odds(
        &self,
        sport_key: &str,
        event_id: &str,
        markets: &[String],
    ) -> Result<EventOdds>;

    /// Provider quota left after the latest request, if known.
    fn remaining_credits(&self) -> Option<u64>;
}

/// Manual marketplace-name → sportsbook-name overrides.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Overrides for one scope (an odds-provider sport key).
    async fn load_overrides(&self, scope: &str) -> Result<HashMap<String, String>>;
}

/// Keyed JSON response cache with per-entry expiry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Unexpired value for `key`. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: &serde_json::Value, ttl: chrono::Duration) -> Result<()>;
}
