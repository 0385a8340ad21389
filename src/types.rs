//! Shared types for the FUNDASCREEN pipeline.
//!
//! These types form the data model passed between the screener, the score
//! scraper, the enrichment engine, the filter chain and the ranker. They are
//! kept free of I/O so every stage can depend on them without cycles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Join key column as it appears in every screener view.
pub const TICKER_COLUMN: &str = "Ticker";
pub const INDUSTRY_COLUMN: &str = "Industry";
pub const COUNTRY_COLUMN: &str = "Country";
/// Financial view: net profit margin.
pub const PROFIT_MARGIN_COLUMN: &str = "Profit M";
/// Financial view: EPS growth this year.
pub const EPS_GROWTH_COLUMN: &str = "EPS this Y";
/// Valuation view: price to free cash flow.
pub const PRICE_TO_FCF_COLUMN: &str = "P/FCF";

// ---------------------------------------------------------------------------
// Screener views
// ---------------------------------------------------------------------------

/// One of the three tabular views returned by the screening service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Overview,
    Financial,
    Valuation,
}

impl View {
    pub const ALL: [View; 3] = [View::Overview, View::Financial, View::Valuation];
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Overview => write!(f, "overview"),
            View::Financial => write!(f, "financial"),
            View::Valuation => write!(f, "valuation"),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Screener filter names mapped to their string-encoded expressions,
/// e.g. `"Price/Free Cash Flow" -> "Under 40"`.
///
/// Immutable once built. The same instance is handed to every view query
/// so the three result sets stay comparable and mergeable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterCriteria {
    filters: BTreeMap<String, String>,
}

impl FilterCriteria {
    pub fn new<I, K, V>(filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            filters: filters
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// The three financial health scores scraped for a single ticker.
///
/// `None` marks a score that could not be located or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    /// Piotroski F-Score (0–9, higher is stronger).
    pub piotroski_f: Option<f64>,
    /// Altman Z-Score (higher is lower bankruptcy risk).
    pub altman_z: Option<f64>,
    /// Beneish M-Score (more negative is lower manipulation risk).
    pub beneish_m: Option<f64>,
}

impl ScoreBundle {
    /// The "not yet scored" placeholder every overview record starts with.
    pub fn unscored() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.piotroski_f.is_some() && self.altman_z.is_some() && self.beneish_m.is_some()
    }
}

impl fmt::Display for ScoreBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"));
        write!(
            f,
            "F={} Z={} M={}",
            show(self.piotroski_f),
            show(self.altman_z),
            show(self.beneish_m),
        )
    }
}

// ---------------------------------------------------------------------------
// Ticker record
// ---------------------------------------------------------------------------

/// One screener row for one ticker in one view.
///
/// Cells are kept as the raw strings the screener returned; numeric
/// coercion happens in the stages that need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub ticker: String,
    pub columns: BTreeMap<String, String>,
    /// Populated by the enricher; only meaningful on overview rows.
    pub scores: ScoreBundle,
}

impl TickerRecord {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            columns: BTreeMap::new(),
            scores: ScoreBundle::unscored(),
        }
    }

    /// Builder-style column setter.
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Raw cell value. Empty cells are reported as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn industry(&self) -> Option<&str> {
        self.get(INDUSTRY_COLUMN)
    }

    pub fn country(&self) -> Option<&str> {
        self.get(COUNTRY_COLUMN)
    }

    /// Cell coerced to a number, `None` when absent or non-numeric.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(coerce_numeric)
    }
}

impl fmt::Display for TickerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} | {}] {}",
            self.ticker,
            self.industry().unwrap_or("-"),
            self.country().unwrap_or("-"),
            self.scores,
        )
    }
}

/// Coerce a free-form screener cell to `f64`.
///
/// Accepts a trailing `%` and thousands separators (`"1,234.5%"`). Anything
/// else that fails to parse, including the screener's `"-"` placeholder and
/// non-finite values, is treated as missing.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Ranked record
// ---------------------------------------------------------------------------

/// A merged overview + financial + valuation row with its ranks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub ticker: String,
    pub columns: BTreeMap<String, String>,
    pub scores: ScoreBundle,
    pub profit_margin: Option<f64>,
    pub eps_growth: Option<f64>,
    pub price_to_fcf: Option<f64>,
    /// Rank 1 = highest profit margin.
    pub profit_margin_rank: f64,
    /// Rank 1 = highest EPS growth.
    pub eps_growth_rank: f64,
    /// Rank 1 = lowest P/FCF.
    pub price_to_fcf_rank: f64,
    /// Sum of the three ranks; lower is better.
    pub total_rank: f64,
}

impl fmt::Display for RankedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total={:.1} (PM #{:.1} | EPS #{:.1} | P/FCF #{:.1})",
            self.ticker,
            self.total_rank,
            self.profit_margin_rank,
            self.eps_growth_rank,
            self.price_to_fcf_rank,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures of the screening service. Every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("Screener unavailable ({view}): {message}")]
    Unavailable { view: View, message: String },

    #[error("Malformed screener output ({view}): {message}")]
    Malformed { view: View, message: String },

    #[error("Unknown screener filter: {name} = {value}")]
    UnknownFilter { name: String, value: String },
}

/// Transient failures while fetching scores for one ticker.
///
/// These are the only outcomes the enricher retries. A page that was
/// fetched but held no usable data is `Ok(None)`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The response arrived but its body could not be read. Timeouts and
    /// connection resets at this stage land here and take the retry path,
    /// unlike the same failures during `send`, which mean no data.
    #[error("Failed to read score page for {ticker}: {message}")]
    Body { ticker: String, message: String },

    #[error("Unexpected score fetch failure for {ticker}: {message}")]
    Unexpected { ticker: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
