//! Mock collaborators for integration testing.
//!
//! Provides a deterministic `Screener` serving fixed views and a scripted
//! `ScoreSource` whose per-ticker responses and call counts are fully
//! controllable from test code. No network access.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use fundascreen::scores::ScoreSource;
use fundascreen::screener::Screener;
use fundascreen::types::*;

// ---------------------------------------------------------------------------
// Screener
// ---------------------------------------------------------------------------

/// In-memory screener returning fixed rows per view.
pub struct MockScreener {
    overview: Vec<TickerRecord>,
    financial: Vec<TickerRecord>,
    valuation: Vec<TickerRecord>,
    /// Every call as (view, criteria).
    calls: Arc<Mutex<Vec<(View, FilterCriteria)>>>,
    /// If set, fetching this view fails.
    fail_on: Option<View>,
}

impl MockScreener {
    pub fn new(
        overview: Vec<TickerRecord>,
        financial: Vec<TickerRecord>,
        valuation: Vec<TickerRecord>,
    ) -> Self {
        Self {
            overview,
            financial,
            valuation,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, view: View) -> Self {
        self.fail_on = Some(view);
        self
    }

    /// Shared handle to the call log, readable after the screener is moved.
    pub fn call_log(&self) -> Arc<Mutex<Vec<(View, FilterCriteria)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Screener for MockScreener {
    async fn fetch(
        &self,
        view: View,
        criteria: &FilterCriteria,
    ) -> Result<Vec<TickerRecord>, ScreenerError> {
        self.calls.lock().unwrap().push((view, criteria.clone()));

        if self.fail_on == Some(view) {
            return Err(ScreenerError::Unavailable {
                view,
                message: "simulated outage".to_string(),
            });
        }

        Ok(match view {
            View::Overview => self.overview.clone(),
            View::Financial => self.financial.clone(),
            View::Valuation => self.valuation.clone(),
        })
    }

    fn name(&self) -> &str {
        "mock-screener"
    }
}

// ---------------------------------------------------------------------------
// Score source
// ---------------------------------------------------------------------------

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Step {
    Scores(ScoreBundle),
    NoData,
    Fail,
}

/// Score source replaying a per-ticker script. Once a script runs out the
/// last step repeats. Unknown tickers get `NoData`.
#[derive(Clone, Default)]
pub struct ScriptedScoreSource {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Step>>>>,
    attempts: Arc<Mutex<HashMap<String, u32>>>,
}

impl ScriptedScoreSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, ticker: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(ticker.to_string(), steps.into());
        self
    }

    pub fn scores(self, ticker: &str, f: f64, z: f64, m: f64) -> Self {
        self.script(
            ticker,
            vec![Step::Scores(ScoreBundle {
                piotroski_f: Some(f),
                altman_z: Some(z),
                beneish_m: Some(m),
            })],
        )
    }

    pub fn attempts(&self, ticker: &str) -> u32 {
        self.attempts.lock().unwrap().get(ticker).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ScoreSource for ScriptedScoreSource {
    async fn fetch_scores(&self, ticker: &str) -> Result<Option<ScoreBundle>, ScrapeError> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(ticker.to_string())
            .or_insert(0) += 1;

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(ticker) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };

        match step {
            Some(Step::Scores(bundle)) => Ok(Some(bundle)),
            Some(Step::NoData) | None => Ok(None),
            Some(Step::Fail) => Err(ScrapeError::Unexpected {
                ticker: ticker.to_string(),
                message: "simulated connection reset".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

pub fn overview_row(ticker: &str, industry: &str, country: &str) -> TickerRecord {
    TickerRecord::new(ticker)
        .with_column(INDUSTRY_COLUMN, industry)
        .with_column(COUNTRY_COLUMN, country)
}

pub fn financial_row(ticker: &str, profit_margin: &str, eps_growth: &str) -> TickerRecord {
    TickerRecord::new(ticker)
        .with_column(PROFIT_MARGIN_COLUMN, profit_margin)
        .with_column(EPS_GROWTH_COLUMN, eps_growth)
}

pub fn valuation_row(ticker: &str, price_to_fcf: &str) -> TickerRecord {
    TickerRecord::new(ticker).with_column(PRICE_TO_FCF_COLUMN, price_to_fcf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_source_replays_then_repeats() {
        let source = ScriptedScoreSource::new().script(
            "AAA",
            vec![Step::Fail, Step::NoData],
        );
        tokio_test::assert_err!(source.fetch_scores("AAA").await);
        assert!(matches!(source.fetch_scores("AAA").await, Ok(None)));
        assert!(matches!(source.fetch_scores("AAA").await, Ok(None)));
        assert_eq!(source.attempts("AAA"), 3);
    }

    #[tokio::test]
    async fn test_scripted_source_unknown_ticker() {
        let source = ScriptedScoreSource::new();
        assert!(matches!(source.fetch_scores("ZZZ").await, Ok(None)));
        assert_eq!(source.attempts("ZZZ"), 1);
    }

    #[tokio::test]
    async fn test_mock_screener_forced_error() {
        let screener = MockScreener::new(vec![], vec![], vec![]).failing_on(View::Valuation);
        let criteria = FilterCriteria::default();
        tokio_test::assert_ok!(screener.fetch(View::Overview, &criteria).await);
        tokio_test::assert_err!(screener.fetch(View::Valuation, &criteria).await);
        assert_eq!(screener.call_log().lock().unwrap().len(), 2);
    }
}
