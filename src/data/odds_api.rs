//! The-Odds-API client.
//!
//! API docs: https://the-odds-api.com/liveapi/guides/v4/
//! Auth: `apiKey` query parameter. Quota is counted in credits and the
//! remainder comes back in the `x-requests-remaining` header.
//!
//! Events cost about one credit, an event's player props about ten, so
//! every response goes through the shared `ResponseCache` first.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use super::{OddsSource, ResponseCache};
use crate::config::OddsApiConfig;
use crate::types::{Event, EventOdds};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const CREDITS_HEADER: &str = "x-requests-remaining";
const CREDITS_UNKNOWN: i64 = -1;

pub fn events_cache_key(sport_key: &str) -> String {
    format!("events:{sport_key}")
}

pub fn props_cache_key(sport_key: &str, event_id: &str, markets: &[String]) -> String {
    format!("props:{sport_key}:{event_id}:{}", markets.join(","))
}

/// Remaining credits from a response, if the header is present and numeric.
fn parse_credits(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(CREDITS_HEADER)?.to_str().ok()?.trim();
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OddsApiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    regions: String,
    odds_format: String,
    events_timeout: Duration,
    odds_timeout: Duration,
    cache: Arc<dyn ResponseCache>,
    cache_ttl: chrono::Duration,
    credits: AtomicI64,
}

impl OddsApiClient {
    pub fn new(
        config: &OddsApiConfig,
        api_key: SecretString,
        cache: Arc<dyn ResponseCache>,
        cache_ttl: chrono::Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent("PROPEDGE/0.1.0")
            .build()
            .context("Failed to build HTTP client for The-Odds-API")?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            regions: config.regions.clone(),
            odds_format: config.odds_format.clone(),
            events_timeout: Duration::from_secs(config.events_timeout_secs),
            odds_timeout: Duration::from_secs(config.odds_timeout_secs),
            cache,
            cache_ttl,
            credits: AtomicI64::new(CREDITS_UNKNOWN),
        })
    }

    // -- Internal helpers ------------------------------------------------

    /// GET `url` through the cache. The API key is appended here and never
    /// appears in logs or cache keys.
    async fn get_cached(
        &self,
        cache_key: &str,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        match self.cache.get(cache_key).await {
            Ok(Some(hit)) => {
                debug!(cache_key, "Odds cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => warn!(cache_key, error = %e, "Odds cache read failed"),
        }

        debug!(url = %url, "Fetching from The-Odds-API");

        let resp = self
            .http
            .get(url)
            .query(&[("apiKey", self.api_key.expose_secret().as_str())])
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .context("The-Odds-API request failed")?;

        if let Some(remaining) = parse_credits(resp.headers()) {
            self.credits.store(remaining as i64, Ordering::Relaxed);
            debug!(remaining, "The-Odds-API credits");
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("The-Odds-API error {status}: {body}");
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse The-Odds-API response")?;

        if let Err(e) = self.cache.set(cache_key, &value, self.cache_ttl).await {
            warn!(cache_key, error = %e, "Odds cache write failed");
        }

        Ok(value)
    }
}

#[async_trait]
impl OddsSource for OddsApiClient {
    async fn fetch_events(&self, sport_key: &str) -> Result<Vec<Event>> {
        let url = format!(
            "{}/sports/{}/events",
            self.base_url,
            urlencoding::encode(sport_key)
        );
        let value = self
            .get_cached(&events_cache_key(sport_key), &url, &[], self.events_timeout)
            .await?;

        serde_json::from_value(value).context("Unexpected The-Odds-API events shape")
    }

    async fn fetch_event_odds(
        &self,
        sport_key: &str,
        event_id: &str,
        markets: &[String],
    ) -> Result<EventOdds> {
        let url = format!(
            "{}/sports/{}/events/{}/odds",
            self.base_url,
            urlencoding::encode(sport_key),
            urlencoding::encode(event_id),
        );
        let markets_param = markets.join(",");
        let params = [
            ("regions", self.regions.as_str()),
            ("markets", markets_param.as_str()),
            ("oddsFormat", self.odds_format.as_str()),
        ];
        let value = self
            .get_cached(
                &props_cache_key(sport_key, event_id, markets),
                &url,
                &params,
                self.odds_timeout,
            )
            .await
            .with_context(|| format!("Odds fetch failed for event {event_id}"))?;

        serde_json::from_value(value).context("Unexpected The-Odds-API event odds shape")
    }

    fn remaining_credits(&self) -> Option<u64> {
        let raw = self.credits.load(Ordering::Relaxed);
        (raw >= 0).then_some(raw as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
