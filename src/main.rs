//! PROPEDGE - +EV player-prop scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the database and dispatches the requested subcommand. `watch`
//! runs the scan loop with graceful shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use propedge::cli::{
    self, Cli, Commands, OverrideCommand, ScanArgs, SettleArgs, WatchArgs,
};
use propedge::config::AppConfig;
use propedge::dashboard::{self, routes::DashboardState};
use propedge::data::cache::MemoryCache;
use propedge::data::markets;
use propedge::data::odds_api::OddsApiClient;
use propedge::data::prizepicks::PrizePicksClient;
use propedge::data::ResponseCache;
use propedge::engine::scanner::{EvScanner, ScannerConfig};
use propedge::storage::{BetResult, Database};
use propedge::types::ScanReport;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let cfg = AppConfig::load_or_default(&cli.config)?;
    cfg.validate()?;

    let db = Database::open(&cfg.storage.database_path).await?;

    match cli.command {
        Commands::Scan(args) => run_scan(&cfg, &db, args).await,
        Commands::Watch(args) => run_watch(&cfg, &db, args).await,
        Commands::Override(OverrideCommand::Add(args)) => {
            let league = markets::league(&args.league)?;
            db.save_override(&args.prizepicks_name, &args.odds_api_name, league.odds_api_sport_key)
                .await?;
            info!(
                prizepicks_name = %args.prizepicks_name,
                odds_api_name = %args.odds_api_name,
                sport = league.odds_api_sport_key,
                "Override saved"
            );
            Ok(())
        }
        Commands::Override(OverrideCommand::List) => {
            print!("{}", cli::render_overrides(&db.list_overrides().await?));
            Ok(())
        }
        Commands::Pending => {
            print!("{}", cli::render_pending(&db.pending_opportunities().await?));
            Ok(())
        }
        Commands::Settle(args) => settle(&db, args).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn run_scan(cfg: &AppConfig, db: &Database, args: ScanArgs) -> Result<()> {
    let league = args.league.unwrap_or_else(|| cfg.scanner.league.clone());
    let min_edge = resolve_min_edge(cfg, args.min_edge)?;
    let (scanner, _) = build_scanner(cfg, db)?;

    let report = scanner.scan(&league, min_edge).await?;
    log_scan_report(&report);
    print!("{}", cli::render_report(&report));

    if !args.no_save {
        save_opportunities(db, &report).await;
    }

    if let Some(format) = args.export {
        if report.is_empty() {
            info!("Nothing to export");
        } else {
            let path = cli::write_export(&report, format, Path::new("."))?;
            info!(path = %path.display(), "Results exported");
        }
    }
    Ok(())
}

async fn run_watch(cfg: &AppConfig, db: &Database, args: WatchArgs) -> Result<()> {
    let league = args.league.unwrap_or_else(|| cfg.scanner.league.clone());
    let min_edge = resolve_min_edge(cfg, args.min_edge)?;
    let interval_secs = args.interval.unwrap_or(cfg.scanner.scan_interval_secs).max(1);
    let (scanner, memory_cache) = build_scanner(cfg, db)?;

    let state = Arc::new(DashboardState::new(&league));
    if args.dashboard || cfg.dashboard.enabled {
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port);
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        league = %league,
        interval_secs,
        min_edge,
        "Entering watch loop. Press Ctrl+C to stop."
    );

    let mut scans = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                scans += 1;
                match scanner.scan(&league, min_edge).await {
                    Ok(report) => {
                        log_scan_report(&report);
                        print!("{}", cli::render_report(&report));
                        save_opportunities(db, &report).await;
                        state.record_scan(&report).await;
                    }
                    Err(e) => error!(scan = scans, error = %e, "Scan failed, continuing to next"),
                }

                match &memory_cache {
                    Some(cache) => {
                        cache.evict_expired().await;
                    }
                    None => {
                        if let Err(e) = db.purge_expired_cache().await {
                            warn!(error = %e, "Failed to purge odds cache");
                        }
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(scans, "PROPEDGE shut down cleanly.");
    Ok(())
}

async fn settle(db: &Database, args: SettleArgs) -> Result<()> {
    let result: BetResult = args.result.parse()?;
    if db.update_result(args.id, result, args.actual).await? {
        info!(id = args.id, result = %result, actual = ?args.actual, "Opportunity settled");
        Ok(())
    } else {
        bail!("No saved opportunity with id {}", args.id)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Build the scanner over the live clients. Returns the in-process cache
/// when one is used so the caller can evict from it.
fn build_scanner(cfg: &AppConfig, db: &Database) -> Result<(EvScanner, Option<Arc<MemoryCache>>)> {
    let api_key = cfg
        .odds_api_key()
        .context("The-Odds-API key is required to scan")?;

    let memory_cache = (!cfg.cache.persistent).then(|| Arc::new(MemoryCache::new()));
    let cache: Arc<dyn ResponseCache> = match &memory_cache {
        Some(memory) => memory.clone(),
        None => Arc::new(db.clone()),
    };

    let props = PrizePicksClient::new(&cfg.prizepicks)?;
    let odds = OddsApiClient::new(&cfg.odds_api, api_key, cache, cfg.cache.ttl())?;

    let scanner = EvScanner::new(
        Arc::new(props),
        Arc::new(odds),
        Arc::new(db.clone()),
        ScannerConfig {
            payout_structure: cfg.scanner.payout_structure.clone(),
            event_concurrency: cfg.scanner.event_concurrency,
        },
    );
    Ok((scanner, memory_cache))
}

/// `--min-edge` is given in percent; config holds a fraction.
fn resolve_min_edge(cfg: &AppConfig, percent: Option<f64>) -> Result<f64> {
    let min_edge = percent.map_or(cfg.scanner.min_edge, cli::percent_to_fraction);
    if !(0.0..1.0).contains(&min_edge) {
        bail!("--min-edge must be between 0 and 100 percent");
    }
    Ok(min_edge)
}

async fn save_opportunities(db: &Database, report: &ScanReport) {
    let mut saved = 0usize;
    for opp in &report.opportunities {
        match db.save_opportunity(opp).await {
            Ok(_) => saved += 1,
            Err(e) => error!(player = %opp.player_name, error = %e, "Failed to save opportunity"),
        }
    }
    if saved > 0 {
        info!(saved, "Opportunities saved");
    }
}

/// Log a one-line scan summary.
fn log_scan_report(report: &ScanReport) {
    info!(
        league = %report.league,
        props = report.props_fetched,
        events = report.events_found,
        events_failed = report.events_failed,
        matched = report.players_matched,
        opportunities = report.opportunities.len(),
        best_edge = ?report.best_edge(),
        credits_remaining = ?report.credits_remaining,
        reason = ?report.reason,
        "Scan complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("propedge=info"));

    let json_logging = std::env::var("PROPEDGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
