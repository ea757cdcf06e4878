//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default, so a partial (or missing) file is valid.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime into a `SecretString`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::warn;

use crate::strategy::edge::{PayoutStructure, DEFAULT_PAYOUT_STRUCTURE};
use crate::types::PropEdgeError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerSettings,
    pub odds_api: OddsApiConfig,
    pub prizepicks: PrizePicksConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerSettings {
    pub league: String,
    /// Minimum edge as a fraction (0.02 = 2%).
    pub min_edge: f64,
    pub payout_structure: String,
    /// Maximum in-flight per-event odds requests.
    pub event_concurrency: usize,
    /// Pause between scans in `watch` mode.
    pub scan_interval_secs: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            league: "NBA".to_string(),
            min_edge: 0.02,
            payout_structure: DEFAULT_PAYOUT_STRUCTURE.to_string(),
            event_concurrency: 4,
            scan_interval_secs: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OddsApiConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub regions: String,
    pub odds_format: String,
    pub events_timeout_secs: u64,
    pub odds_timeout_secs: u64,
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.the-odds-api.com/v4".to_string(),
            api_key_env: "ODDS_API_KEY".to_string(),
            regions: "us".to_string(),
            odds_format: "american".to_string(),
            events_timeout_secs: 10,
            odds_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PrizePicksConfig {
    pub base_url: String,
    pub per_page: u32,
    pub timeout_secs: u64,
}

impl Default for PrizePicksConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.prizepicks.com".to_string(),
            per_page: 250,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: i64,
    /// Keep odds responses in the database so they survive restarts.
    /// When false an in-process cache is used.
    pub persistent: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            persistent: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "propedge.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject settings that would make every scan meaningless.
    pub fn validate(&self) -> Result<(), PropEdgeError> {
        self.scanner.payout_structure.parse::<PayoutStructure>()?;

        let min_edge = self.scanner.min_edge;
        if !(0.0..1.0).contains(&min_edge) {
            return Err(PropEdgeError::Config(format!(
                "scanner.min_edge must be in [0, 1), got {min_edge}"
            )));
        }
        if self.scanner.event_concurrency == 0 {
            return Err(PropEdgeError::Config(
                "scanner.event_concurrency must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_minutes < 0 {
            return Err(PropEdgeError::Config(
                "cache.ttl_minutes must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The odds provider key, wrapped so it can't leak through `Debug`.
    pub fn odds_api_key(&self) -> Result<SecretString> {
        Self::resolve_env(&self.odds_api.api_key_env).map(SecretString::new)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
