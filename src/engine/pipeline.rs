//! One screening run: screen → enrich → filter → merge/rank → write.
//!
//! All collaborators are built once by the caller and handed in; the
//! pipeline holds no global state. Only screener failures abort the run;
//! everything downstream degrades to missing data.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use super::enricher::{Enricher, EnrichmentReport};
use super::filter::FilterEngine;
use super::ranker::merge_and_rank;
use crate::config::OutputConfig;
use crate::screener::{fetch_views, Screener};
use crate::storage;
use crate::types::{FilterCriteria, RankedRecord};

/// Stage counts and timing of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub overview_rows: usize,
    pub financial_rows: usize,
    pub valuation_rows: usize,
    pub enrichment: EnrichmentReport,
    pub passed_filters: usize,
    pub ranked: usize,
    pub written: usize,
    pub output_path: PathBuf,
}

impl RunReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

pub struct Pipeline {
    screener: Box<dyn Screener>,
    criteria: FilterCriteria,
    enricher: Enricher,
    filter: FilterEngine,
    output: OutputConfig,
}

impl Pipeline {
    pub fn new(
        screener: Box<dyn Screener>,
        criteria: FilterCriteria,
        enricher: Enricher,
        filter: FilterEngine,
        output: OutputConfig,
    ) -> Self {
        Self {
            screener,
            criteria,
            enricher,
            filter,
            output,
        }
    }

    /// Execute the full run and write the ticker list.
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        info!(output = %self.output.path, "Starting screening run");

        // 1. Screen (fatal on failure)
        let views = fetch_views(self.screener.as_ref(), &self.criteria)
            .await
            .context("Screener query failed")?;
        let overview_rows = views.overview.len();

        // 2. Enrich overview rows in place
        let mut overview = views.overview;
        let enrichment = self.enricher.enrich_batch(&mut overview).await;

        // 3. Filter
        let survivors = self.filter.filter(overview);
        let passed_filters = survivors.len();

        // 4. Merge + rank
        let mut ranked = merge_and_rank(&survivors, &views.financial, &views.valuation);
        let ranked_count = ranked.len();
        if let Some(limit) = self.output.limit {
            ranked.truncate(limit);
        }

        // 5. Write
        let output_path = PathBuf::from(&self.output.path);
        let tickers: Vec<&str> = ranked.iter().map(|r| r.ticker.as_str()).collect();
        storage::write_tickers(&tickers, &output_path)?;
        if let Some(report_path) = &self.output.report_path {
            storage::write_report(&ranked, Path::new(report_path))?;
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            overview_rows,
            financial_rows: views.financial.len(),
            valuation_rows: views.valuation.len(),
            enrichment,
            passed_filters,
            ranked: ranked_count,
            written: tickers.len(),
            output_path,
        };
        log_top(&ranked);
        Ok(report)
    }
}

fn log_top(ranked: &[RankedRecord]) {
    for (i, r) in ranked.iter().take(10).enumerate() {
        info!(position = i + 1, ticker = %r.ticker, total_rank = r.total_rank, "Ranked");
    }
}
