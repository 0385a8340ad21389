//! Score enrichment pipeline.
//!
//! Drives a `ScoreSource` across every overview record and writes the
//! scores back in place. Per-ticker failures are isolated: the worst a
//! ticker can do is end up with missing scores.
//!
//! Retry policy: only `Err` outcomes (transient failures) are retried, up to
//! `max_attempts` total calls with a fixed backoff in between. `Ok(None)`
//! means the page had nothing for us and ends that ticker immediately.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EnrichmentConfig;
use crate::scores::ScoreSource;
use crate::types::{ScoreBundle, TickerRecord};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// How enrichment ended for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerStatus {
    /// A bundle was written (individual fields may still be missing).
    Scored,
    /// The source had no data. Not retried.
    NoData,
    /// Every attempt failed transiently.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerOutcome {
    pub ticker: String,
    pub attempts: u32,
    pub status: TickerStatus,
}

/// Per-ticker results of one enrichment pass, in record order.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub outcomes: Vec<TickerOutcome>,
}

impl EnrichmentReport {
    fn count(&self, status: TickerStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn scored(&self) -> usize {
        self.count(TickerStatus::Scored)
    }

    pub fn no_data(&self) -> usize {
        self.count(TickerStatus::NoData)
    }

    pub fn exhausted(&self) -> usize {
        self.count(TickerStatus::Exhausted)
    }

    /// Total calls made to the score source.
    pub fn total_attempts(&self) -> u64 {
        self.outcomes.iter().map(|o| o.attempts as u64).sum()
    }

    pub fn outcome(&self, ticker: &str) -> Option<&TickerOutcome> {
        self.outcomes.iter().find(|o| o.ticker == ticker)
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Bounded-concurrency score enricher.
pub struct Enricher {
    source: Arc<dyn ScoreSource>,
    max_attempts: u32,
    backoff: Duration,
    workers: usize,
}

impl Enricher {
    pub fn new(source: Arc<dyn ScoreSource>, config: &EnrichmentConfig) -> Self {
        Self {
            source,
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_secs_f64(config.backoff_secs.max(0.0)),
            workers: config.workers.max(1),
        }
    }

    /// Enrich every record in place.
    ///
    /// With more than one worker, fetches overlap but each ticker's retry
    /// loop stays inside its own future. Records are visited exactly once
    /// and the report follows record order.
    pub async fn enrich_batch(&self, records: &mut [TickerRecord]) -> EnrichmentReport {
        let total = records.len();
        info!(
            count = total,
            workers = self.workers,
            max_attempts = self.max_attempts,
            "Retrieving scores"
        );

        let tickers: Vec<String> = records.iter().map(|r| r.ticker.clone()).collect();

        let results: Vec<(Option<ScoreBundle>, TickerOutcome)> = stream::iter(tickers.into_iter().enumerate())
            .map(|(idx, ticker)| async move {
                let result = self.enrich_one(ticker).await;
                info!(
                    progress = format!("{}/{}", idx + 1, total),
                    ticker = %result.1.ticker,
                    status = ?result.1.status,
                    "Retrieving scores"
                );
                result
            })
            .buffered(self.workers)
            .collect()
            .await;

        let mut report = EnrichmentReport {
            outcomes: Vec::with_capacity(total),
        };
        for (record, (bundle, outcome)) in records.iter_mut().zip(results) {
            if let Some(bundle) = bundle {
                record.scores = bundle;
            }
            report.outcomes.push(outcome);
        }

        info!(
            scored = report.scored(),
            no_data = report.no_data(),
            exhausted = report.exhausted(),
            attempts = report.total_attempts(),
            "Score retrieval complete"
        );

        report
    }

    /// Fetch one ticker with the retry policy applied.
    async fn enrich_one(&self, ticker: String) -> (Option<ScoreBundle>, TickerOutcome) {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.source.fetch_scores(&ticker).await {
                Ok(Some(bundle)) => {
                    debug!(ticker = %ticker, attempts, scores = %bundle, "Scores retrieved");
                    let outcome = TickerOutcome {
                        ticker,
                        attempts,
                        status: TickerStatus::Scored,
                    };
                    return (Some(bundle), outcome);
                }
                Ok(None) => {
                    debug!(ticker = %ticker, attempts, "No score data");
                    let outcome = TickerOutcome {
                        ticker,
                        attempts,
                        status: TickerStatus::NoData,
                    };
                    return (None, outcome);
                }
                Err(e) if attempts >= self.max_attempts => {
                    warn!(
                        ticker = %ticker,
                        attempts,
                        error = %e,
                        "Score retrieval failed, leaving scores missing"
                    );
                    let outcome = TickerOutcome {
                        ticker,
                        attempts,
                        status: TickerStatus::Exhausted,
                    };
                    return (None, outcome);
                }
                Err(e) => {
                    warn!(
                        ticker = %ticker,
                        attempt = attempts,
                        backoff_ms = self.backoff.as_millis() as u64,
                        error = %e,
                        "Score retrieval error, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
