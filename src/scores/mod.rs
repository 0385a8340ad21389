//! Financial health score sources.
//!
//! Defines the `ScoreSource` trait consumed by the enricher and the
//! `LabelExtractor` seam that isolates the fragile HTML lookup from the
//! network and retry concerns.

pub mod extract;
pub mod gurufocus;

use async_trait::async_trait;
use scraper::Html;

use crate::types::{ScoreBundle, ScrapeError};

/// Labels as printed on the score site.
pub const PIOTROSKI_LABEL: &str = "Piotroski F-Score";
pub const ALTMAN_LABEL: &str = "Altman Z-Score";
pub const BENEISH_LABEL: &str = "Beneish M-Score";

/// Fetches the health scores for a single ticker.
///
/// Three outcomes:
/// - `Ok(Some(bundle))`: page fetched, fields may still be individually missing.
/// - `Ok(None)`: no data for this ticker. Terminal, never retried.
/// - `Err(_)`: transient failure, the caller may retry.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn fetch_scores(&self, ticker: &str) -> Result<Option<ScoreBundle>, ScrapeError>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Finds the raw value printed next to a label in a parsed page.
///
/// Swap the implementation when the remote markup changes.
pub trait LabelExtractor: Send + Sync {
    fn extract(&self, document: &Html, label: &str) -> Option<String>;
}
