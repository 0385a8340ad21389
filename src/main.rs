//! FUNDASCREEN — fundamental equity screener
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the screener and score clients once, and runs a single
//! screen→enrich→filter→rank→write pass.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use fundascreen::config::{self, AppConfig};
use fundascreen::engine::enricher::Enricher;
use fundascreen::engine::filter::FilterEngine;
use fundascreen::engine::pipeline::{Pipeline, RunReport};
use fundascreen::scores::gurufocus::GuruFocusClient;
use fundascreen::screener::finviz::FinvizClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();
    let cfg = load_config()?;

    info!(
        criteria = ?cfg.screener.criteria,
        max_attempts = cfg.enrichment.max_attempts,
        workers = cfg.enrichment.workers,
        output = %cfg.output.path,
        "FUNDASCREEN starting up"
    );

    // -- Initialise components -------------------------------------------

    let screener = FinvizClient::new(&cfg.screener)?;
    let scores = GuruFocusClient::new(&cfg.scores)?;
    if cfg.scores.accept_forbidden {
        info!("HTTP 403 score pages will be parsed");
    }

    let pipeline = Pipeline::new(
        Box::new(screener),
        cfg.screener.filter_criteria(),
        Enricher::new(Arc::new(scores), &cfg.enrichment),
        FilterEngine::new(cfg.filters.clone()),
        cfg.output.clone(),
    );

    // -- Run -------------------------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        result = pipeline.run() => {
            let report = result?;
            log_run_report(&report);
        }
        _ = &mut shutdown => {
            warn!("Shutdown signal received, run aborted.");
        }
    }

    Ok(())
}

/// Load `SCREENER_CONFIG` (default `config.toml`). A missing default file
/// falls back to built-in settings; an explicitly named one must exist.
fn load_config() -> Result<AppConfig> {
    let path = AppConfig::resolve_path();
    let explicit = std::env::var(config::CONFIG_PATH_ENV).is_ok();

    if !explicit && !Path::new(&path).exists() {
        warn!(path = %path, "Config file not found, using built-in defaults");
        return Ok(AppConfig::default());
    }
    AppConfig::load(&path)
}

/// Log a human-readable run summary.
fn log_run_report(report: &RunReport) {
    info!(
        overview = report.overview_rows,
        financial = report.financial_rows,
        valuation = report.valuation_rows,
        scored = report.enrichment.scored(),
        no_data = report.enrichment.no_data(),
        failed = report.enrichment.exhausted(),
        passed_filters = report.passed_filters,
        ranked = report.ranked,
        written = report.written,
        output = %report.output_path.display(),
        duration_secs = report.duration().num_seconds(),
        "Run complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fundascreen=info"));

    let json_logging = std::env::var("SCREENER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
