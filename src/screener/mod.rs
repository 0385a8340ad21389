//! Screener integrations.
//!
//! Defines the `Screener` trait and the Finviz implementation. A screener
//! answers one query per view; the pipeline always asks for all three views
//! with the same `FilterCriteria`.

pub mod finviz;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::types::{FilterCriteria, ScreenerError, TickerRecord, View};

/// Abstraction over the external screening service.
///
/// Any failure is systemic: implementors do not retry and callers abort the
/// run on error.
#[async_trait]
pub trait Screener: Send + Sync {
    /// Fetch every row of `view` matching `criteria`, in service order.
    async fn fetch(
        &self,
        view: View,
        criteria: &FilterCriteria,
    ) -> Result<Vec<TickerRecord>, ScreenerError>;

    /// Service name for logging.
    fn name(&self) -> &str;
}

/// The three views of one screener run.
#[derive(Debug, Clone, Default)]
pub struct ScreenerViews {
    pub overview: Vec<TickerRecord>,
    pub financial: Vec<TickerRecord>,
    pub valuation: Vec<TickerRecord>,
}

/// Query all three views with identical criteria.
///
/// Views are fetched one after another; the first failure aborts.
pub async fn fetch_views(
    screener: &dyn Screener,
    criteria: &FilterCriteria,
) -> Result<ScreenerViews, ScreenerError> {
    info!(
        screener = screener.name(),
        filters = criteria.len(),
        "Querying screener views"
    );

    let mut views = ScreenerViews::default();
    for view in View::ALL {
        let rows = screener.fetch(view, criteria).await?;
        info!(view = %view, rows = rows.len(), "Screener view fetched");
        for row in rows.iter().take(5) {
            debug!(view = %view, ticker = %row.ticker, columns = row.columns.len(), "Preview");
        }
        match view {
            View::Overview => views.overview = rows,
            View::Financial => views.financial = rows,
            View::Valuation => views.valuation = rows,
        }
    }

    Ok(views)
}
