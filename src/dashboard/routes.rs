//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{Opportunity, ScanReport};

/// Scan summaries kept in memory.
const SCAN_LOG_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub league: String,
    pub started_at: DateTime<Utc>,
    /// Scans recorded since startup. The log below is capped; this isn't.
    pub scans_run: AtomicU64,
    pub latest: RwLock<Option<ScanReport>>,
    pub scan_log: RwLock<Vec<ScanLogEntry>>,
}

impl DashboardState {
    pub fn new(league: &str) -> Self {
        Self {
            league: league.to_string(),
            started_at: Utc::now(),
            scans_run: AtomicU64::new(0),
            latest: RwLock::new(None),
            scan_log: RwLock::new(Vec::new()),
        }
    }

    /// Publish a finished scan.
    pub async fn record_scan(&self, report: &ScanReport) {
        self.scans_run.fetch_add(1, Ordering::Relaxed);
        {
            let mut log = self.scan_log.write().await;
            log.push(ScanLogEntry::from(report));
            let excess = log.len().saturating_sub(SCAN_LOG_LIMIT);
            log.drain(..excess);
        }
        *self.latest.write().await = Some(report.clone());
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub league: String,
    pub scans_run: u64,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub last_scan_opportunities: usize,
    pub last_reason: Option<String>,
    pub credits_remaining: Option<u64>,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanLogEntry {
    pub scan_id: Uuid,
    pub league: String,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub props_fetched: usize,
    pub events_found: usize,
    pub events_failed: usize,
    pub players_matched: usize,
    pub opportunities: usize,
    pub best_edge: Option<f64>,
    pub reason: Option<String>,
}

impl From<&ScanReport> for ScanLogEntry {
    fn from(report: &ScanReport) -> Self {
        Self {
            scan_id: report.scan_id,
            league: report.league.clone(),
            finished_at: report.finished_at,
            duration_ms: (report.finished_at - report.started_at).num_milliseconds(),
            props_fetched: report.props_fetched,
            events_found: report.events_found,
            events_failed: report.events_failed,
            players_matched: report.players_matched,
            opportunities: report.opportunities.len(),
            best_edge: report.best_edge(),
            reason: report.reason.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub type AppState = Arc<DashboardState>;

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let latest = state.latest.read().await;
    Json(StatusResponse {
        league: state.league.clone(),
        scans_run: state.scans_run.load(Ordering::Relaxed),
        last_scan_at: latest.as_ref().map(|r| r.finished_at),
        last_scan_opportunities: latest.as_ref().map_or(0, |r| r.opportunities.len()),
        last_reason: latest.as_ref().and_then(|r| r.reason.clone()),
        credits_remaining: latest.as_ref().and_then(|r| r.credits_remaining),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/opportunities
pub async fn get_opportunities(State(state): State<AppState>) -> Json<Vec<Opportunity>> {
    let latest = state.latest.read().await;
    Json(
        latest
            .as_ref()
            .map(|r| r.opportunities.clone())
            .unwrap_or_default(),
    )
}

/// GET /api/scans
pub async fn get_scans(State(state): State<AppState>) -> Json<Vec<ScanLogEntry>> {
    let log = state.scan_log.read().await;
    Json(log.clone())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
