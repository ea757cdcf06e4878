//! PrizePicks projections client.
//!
//! API: `GET https://api.prizepicks.com/projections`
//! Auth: none, but the endpoint rejects non-browser user agents.
//!
//! Responses follow JSON:API: projections live in `data`, players in
//! `included` as `new_player` resources referenced by id.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::PropsSource;
use crate::config::PrizePicksConfig;
use crate::types::Prop;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const USER_AGENT: &str = "Mozilla/5.0";
const STANDARD_ODDS_TYPE: &str = "standard";
const UNKNOWN_PLAYER: &str = "Unknown";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProjectionsResponse {
    #[serde(default)]
    data: Vec<Projection>,
    #[serde(default)]
    included: Vec<IncludedResource>,
}

#[derive(Debug, Deserialize)]
struct Projection {
    #[serde(default)]
    attributes: ProjectionAttributes,
    #[serde(default)]
    relationships: Option<ProjectionRelationships>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectionAttributes {
    #[serde(default)]
    stat_type: Option<String>,
    /// Usually a number; occasionally a numeric string.
    #[serde(default)]
    line_score: Option<serde_json::Value>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    odds_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectionRelationships {
    #[serde(default)]
    new_player: Option<RelationshipLink>,
}

#[derive(Debug, Deserialize)]
struct RelationshipLink {
    data: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncludedResource {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: serde_json::Value,
}

struct PlayerInfo {
    name: String,
    team: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn line_value(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Turn a projections payload into standard props.
///
/// Goblin/demon projections are dropped, as are projections without a
/// stat type or a usable line.
pub fn parse_projections(body: &str) -> Result<Vec<Prop>> {
    let response: ProjectionsResponse =
        serde_json::from_str(body).context("Failed to parse PrizePicks projections response")?;

    let players: HashMap<String, PlayerInfo> = response
        .included
        .into_iter()
        .filter(|r| r.kind == "new_player")
        .map(|r| {
            let name = r.attributes["display_name"]
                .as_str()
                .unwrap_or(UNKNOWN_PLAYER)
                .to_string();
            let team = r.attributes["team"].as_str().unwrap_or_default().to_string();
            (r.id, PlayerInfo { name, team })
        })
        .collect();

    let mut props = Vec::with_capacity(response.data.len());
    for projection in response.data {
        let attrs = projection.attributes;
        let odds_type = attrs
            .odds_type
            .unwrap_or_else(|| STANDARD_ODDS_TYPE.to_string());
        if odds_type != STANDARD_ODDS_TYPE {
            continue;
        }

        let Some(stat_type) = attrs.stat_type else {
            debug!("Skipping projection without stat_type");
            continue;
        };
        let Some(line) = attrs.line_score.as_ref().and_then(line_value) else {
            debug!(stat_type = %stat_type, "Skipping projection without a usable line");
            continue;
        };

        let player = projection
            .relationships
            .and_then(|r| r.new_player)
            .and_then(|link| link.data)
            .and_then(|id| players.get(&id.id));

        props.push(Prop {
            player_name: player
                .map(|p| p.name.clone())
                .unwrap_or_else(|| UNKNOWN_PLAYER.to_string()),
            team: player.map(|p| p.team.clone()).unwrap_or_default(),
            stat_type,
            line,
            start_time: attrs.start_time.as_deref().and_then(parse_start_time),
            odds_type,
        });
    }

    Ok(props)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PrizePicksClient {
    http: Client,
    base_url: String,
    per_page: u32,
}

impl PrizePicksClient {
    pub fn new(config: &PrizePicksConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for PrizePicks")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
        })
    }
}

#[async_trait]
impl PropsSource for PrizePicksClient {
    async fn fetch_props(&self, league_id: &str) -> Result<Vec<Prop>> {
        let url = format!(
            "{}/projections?league_id={}&single_stat=true&per_page={}",
            self.base_url,
            urlencoding::encode(league_id),
            self.per_page,
        );

        debug!(url = %url, "Fetching PrizePicks projections");

        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("PrizePicks API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("PrizePicks API error {status}: {body}");
        }

        let body = resp
            .text()
            .await
            .context("Failed to read PrizePicks response body")?;
        let props = parse_projections(&body)?;

        info!(league_id, props = props.len(), "PrizePicks props fetched");
        Ok(props)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
