//! Persistence layer.
//!
//! One SQLite file holds three tables:
//! - `player_overrides`: manual marketplace → sportsbook name mappings
//! - `odds_cache`: odds-provider responses with an expiry timestamp
//! - `ev_opportunities`: every saved +EV pick, later settled hit/miss/push

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::data::{OverrideStore, ResponseCache};
use crate::types::{Opportunity, PropEdgeError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS player_overrides (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prizepicks_name TEXT NOT NULL,
        odds_api_name TEXT NOT NULL,
        sport TEXT NOT NULL,
        UNIQUE(prizepicks_name, sport)
    )",
    "CREATE TABLE IF NOT EXISTS odds_cache (
        cache_key TEXT PRIMARY KEY,
        response_json TEXT NOT NULL,
        fetched_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ev_opportunities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_name TEXT NOT NULL,
        stat_type TEXT NOT NULL,
        league TEXT NOT NULL,
        line REAL NOT NULL,
        fair_prob_over REAL NOT NULL,
        fair_prob_under REAL NOT NULL,
        recommended_side TEXT NOT NULL,
        edge REAL NOT NULL,
        quality TEXT NOT NULL,
        num_books INTEGER NOT NULL,
        books_used TEXT NOT NULL,
        game_time TEXT,
        found_at TEXT NOT NULL,
        result TEXT NOT NULL DEFAULT 'pending',
        actual_value REAL
    )",
    "CREATE INDEX IF NOT EXISTS idx_ev_pending
        ON ev_opportunities(result) WHERE result = 'pending'",
    "CREATE INDEX IF NOT EXISTS idx_ev_found_at ON ev_opportunities(found_at)",
];

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Settlement state of a saved opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Pending,
    Hit,
    Miss,
    Push,
}

impl BetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Hit => "hit",
            BetResult::Miss => "miss",
            BetResult::Push => "push",
        }
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetResult {
    type Err = PropEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BetResult::Pending),
            "hit" => Ok(BetResult::Hit),
            "miss" => Ok(BetResult::Miss),
            "push" => Ok(BetResult::Push),
            other => Err(PropEdgeError::Storage(format!("Unknown bet result: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerOverride {
    pub prizepicks_name: String,
    pub odds_api_name: String,
    pub sport: String,
}

/// An opportunity as stored, with its settlement columns.
#[derive(Debug, Clone, Serialize)]
pub struct StoredOpportunity {
    pub id: i64,
    pub player_name: String,
    pub stat_type: String,
    pub league: String,
    pub line: f64,
    pub recommended_side: String,
    pub edge: f64,
    pub quality: String,
    pub books_used: Vec<String>,
    pub game_time: Option<DateTime<Utc>>,
    pub found_at: DateTime<Utc>,
    pub result: BetResult,
    pub actual_value: Option<f64>,
}

/// Fixed-width UTC timestamps so text comparison in SQL orders correctly.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Bad timestamp in database: {raw}"))?
        .with_timezone(&Utc))
}

impl StoredOpportunity {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let books_json: String = row.try_get("books_used")?;
        let game_time: Option<String> = row.try_get("game_time")?;
        let found_at: String = row.try_get("found_at")?;
        let result: String = row.try_get("result")?;

        Ok(Self {
            id: row.try_get("id")?,
            player_name: row.try_get("player_name")?,
            stat_type: row.try_get("stat_type")?,
            league: row.try_get("league")?,
            line: row.try_get("line")?,
            recommended_side: row.try_get("recommended_side")?,
            edge: row.try_get("edge")?,
            quality: row.try_get("quality")?,
            books_used: serde_json::from_str(&books_json)
                .context("Bad books_used column")?,
            game_time: game_time.as_deref().map(parse_timestamp).transpose()?,
            found_at: parse_timestamp(&found_at)?,
            result: result.parse()?,
            actual_value: row.try_get("actual_value")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {path}"))?;

        let db = Self { pool };
        db.migrate().await?;
        info!(path, "Database ready");
        Ok(db)
    }

    /// Private in-memory database. A single never-recycled connection keeps
    /// it alive for the pool's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply database schema")?;
        }
        Ok(())
    }

    // -- Overrides -------------------------------------------------------

    /// Insert or replace the mapping for (`prizepicks_name`, `sport`).
    pub async fn save_override(
        &self,
        prizepicks_name: &str,
        odds_api_name: &str,
        sport: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO player_overrides (prizepicks_name, odds_api_name, sport)
             VALUES (?, ?, ?)
             ON CONFLICT(prizepicks_name, sport) DO UPDATE SET odds_api_name = excluded.odds_api_name",
        )
        .bind(prizepicks_name)
        .bind(odds_api_name)
        .bind(sport)
        .execute(&self.pool)
        .await
        .context("Failed to save player override")?;

        debug!(prizepicks_name, odds_api_name, sport, "Override saved");
        Ok(())
    }

    pub async fn list_overrides(&self) -> Result<Vec<PlayerOverride>> {
        let rows = sqlx::query(
            "SELECT prizepicks_name, odds_api_name, sport FROM player_overrides
             ORDER BY sport, prizepicks_name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list player overrides")?;

        rows.iter()
            .map(|row| -> Result<PlayerOverride> {
                Ok(PlayerOverride {
                    prizepicks_name: row.try_get("prizepicks_name")?,
                    odds_api_name: row.try_get("odds_api_name")?,
                    sport: row.try_get("sport")?,
                })
            })
            .collect()
    }

    // -- Opportunities ---------------------------------------------------

    /// Persist one opportunity as `pending`. Returns the new row id.
    pub async fn save_opportunity(&self, opp: &Opportunity) -> Result<i64> {
        let books_json =
            serde_json::to_string(&opp.books_used).context("Failed to encode books_used")?;

        let result = sqlx::query(
            "INSERT INTO ev_opportunities
             (player_name, stat_type, league, line, fair_prob_over, fair_prob_under,
              recommended_side, edge, quality, num_books, books_used, game_time, found_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&opp.player_name)
        .bind(&opp.stat_type)
        .bind(&opp.league)
        .bind(opp.line)
        .bind(opp.fair_prob_over)
        .bind(opp.fair_prob_under)
        .bind(opp.recommended_side.as_str())
        .bind(opp.edge)
        .bind(opp.quality.label())
        .bind(opp.num_books as i64)
        .bind(books_json)
        .bind(opp.game_time.map(timestamp))
        .bind(timestamp(opp.found_at))
        .execute(&self.pool)
        .await
        .context("Failed to save opportunity")?;

        Ok(result.last_insert_rowid())
    }

    /// Unsettled opportunities, newest first.
    pub async fn pending_opportunities(&self) -> Result<Vec<StoredOpportunity>> {
        let rows = sqlx::query(
            "SELECT * FROM ev_opportunities WHERE result = 'pending'
             ORDER BY found_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load pending opportunities")?;

        rows.iter().map(StoredOpportunity::from_row).collect()
    }

    /// Record how a pick settled. Returns `false` when no row has that id.
    pub async fn update_result(
        &self,
        id: i64,
        result: BetResult,
        actual_value: Option<f64>,
    ) -> Result<bool> {
        let outcome = sqlx::query(
            "UPDATE ev_opportunities SET result = ?, actual_value = ? WHERE id = ?",
        )
        .bind(result.as_str())
        .bind(actual_value)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update opportunity result")?;

        Ok(outcome.rows_affected() > 0)
    }

    // -- Cache -----------------------------------------------------------

    /// Delete every expired cache row. Returns the number removed.
    pub async fn purge_expired_cache(&self) -> Result<u64> {
        let outcome = sqlx::query("DELETE FROM odds_cache WHERE expires_at <= ?")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await
            .context("Failed to purge odds cache")?;
        Ok(outcome.rows_affected())
    }
}

#[async_trait]
impl OverrideStore for Database {
    async fn load_overrides(&self, scope: &str) -> Result<HashMap<String, String>> {
        let rows = sqlx::query(
            "SELECT prizepicks_name, odds_api_name FROM player_overrides WHERE sport = ?",
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load player overrides")?;

        rows.iter()
            .map(|row| -> Result<(String, String)> {
                Ok((row.try_get("prizepicks_name")?, row.try_get("odds_api_name")?))
            })
            .collect()
    }
}

#[async_trait]
impl ResponseCache for Database {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT response_json, expires_at FROM odds_cache WHERE cache_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read odds cache")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.try_get("expires_at")?;
        if Utc::now() >= parse_timestamp(&expires_at)? {
            sqlx::query("DELETE FROM odds_cache WHERE cache_key = ?")
                .bind(key)
                .execute(&self.pool)
                .await
                .context("Failed to delete expired cache row")?;
            return Ok(None);
        }

        let body: String = row.try_get("response_json")?;
        let value = serde_json::from_str(&body).context("Corrupt cached response")?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &serde_json::Value, ttl: chrono::Duration) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT OR REPLACE INTO odds_cache (cache_key, response_json, fetched_at, expires_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(key)
        .bind(value.to_string())
        .bind(timestamp(now))
        .bind(timestamp(now + ttl))
        .execute(&self.pool)
        .await
        .context("Failed to write odds cache")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
