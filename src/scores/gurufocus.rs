//! GuruFocus score scraper.
//!
//! Fetches `{base}/stock/{ticker}/summary` and reads the Piotroski, Altman
//! and Beneish scores from the page's label/value table cells.
//!
//! The site rejects default HTTP client identities, so requests carry a
//! browser `User-Agent`. Some blocked responses arrive as 403 with the full
//! page body; whether those are parsed is the `accept_forbidden` policy.
//! That behaviour is an observation about the remote service, not a
//! documented contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::Html;
use tracing::{debug, warn};

use super::extract::{extract_scores, AdjacentCellExtractor};
use super::{LabelExtractor, ScoreSource};
use crate::config::ScoresConfig;
use crate::types::{ScoreBundle, ScrapeError};

const SOURCE_NAME: &str = "gurufocus";

/// GuruFocus profile page client.
pub struct GuruFocusClient {
    http: Client,
    base_url: String,
    accept_forbidden: bool,
    extractor: Box<dyn LabelExtractor>,
}

impl GuruFocusClient {
    pub fn new(config: &ScoresConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client for GuruFocus")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            accept_forbidden: config.accept_forbidden,
            extractor: Box::new(AdjacentCellExtractor),
        })
    }

    /// Replace the label extractor, e.g. after a markup change.
    pub fn with_extractor(mut self, extractor: Box<dyn LabelExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Screener symbols use `-` as class separator (`BRK-B`); the score
    /// site uses `.` (`BRK.B`).
    pub fn normalize_ticker(ticker: &str) -> String {
        ticker.trim().replace('-', ".")
    }

    pub fn profile_url(&self, ticker: &str) -> String {
        format!(
            "{}/stock/{}/summary",
            self.base_url,
            urlencoding::encode(&Self::normalize_ticker(ticker)),
        )
    }

    /// Statuses whose body is worth parsing.
    fn is_parseable(&self, status: StatusCode) -> bool {
        status == StatusCode::OK || (self.accept_forbidden && status == StatusCode::FORBIDDEN)
    }

    fn scores_from_body(&self, body: &str, ticker: &str) -> ScoreBundle {
        let document = Html::parse_document(body);
        extract_scores(&document, self.extractor.as_ref(), ticker)
    }
}

#[async_trait]
impl ScoreSource for GuruFocusClient {
    async fn fetch_scores(&self, ticker: &str) -> Result<Option<ScoreBundle>, ScrapeError> {
        let url = self.profile_url(ticker);
        debug!(ticker, url = %url, "Fetching score page");

        let resp = match self.http.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(ticker, error = %e, "Score page request failed");
                return Ok(None);
            }
        };

        let status = resp.status();
        if !self.is_parseable(status) {
            warn!(ticker, status = %status, "Score page unavailable");
            return Ok(None);
        }

        let body = resp.text().await.map_err(|e| ScrapeError::Body {
            ticker: ticker.to_string(),
            message: e.to_string(),
        })?;

        let bundle = self.scores_from_body(&body, ticker);
        debug!(ticker, status = %status, scores = %bundle, "Scores extracted");
        Ok(Some(bundle))
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
