//! Label-adjacency extraction of the three health scores.

use scraper::{ElementRef, Html};
use tracing::debug;

use super::{LabelExtractor, ALTMAN_LABEL, BENEISH_LABEL, PIOTROSKI_LABEL};
use crate::types::ScoreBundle;

/// Reads the first table cell following the label text in document order.
///
/// The label must match a text node exactly after trimming. The first
/// occurrence wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacentCellExtractor;

impl LabelExtractor for AdjacentCellExtractor {
    fn extract(&self, document: &Html, label: &str) -> Option<String> {
        let mut after_label = false;

        for node in document.tree.root().descendants() {
            if !after_label {
                after_label = node
                    .value()
                    .as_text()
                    .is_some_and(|text| text.trim() == label);
                continue;
            }

            if let Some(element) = ElementRef::wrap(node) {
                if element.value().name() == "td" {
                    let value = element
                        .text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    return Some(value);
                }
            }
        }

        None
    }
}

/// Parse a raw score cell. Piotroski is printed as `"x/9"`; only the
/// numerator is kept.
pub fn parse_score(label: &str, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let number = if label == PIOTROSKI_LABEL {
        raw.split('/').next().unwrap_or(raw).trim()
    } else {
        raw
    };
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pull all three scores out of a parsed page.
///
/// Each field is looked up independently; a missing label or an
/// unparseable value only blanks that field.
pub fn extract_scores(document: &Html, extractor: &dyn LabelExtractor, ticker: &str) -> ScoreBundle {
    let score = |label: &str| -> Option<f64> {
        let Some(raw) = extractor.extract(document, label) else {
            debug!(ticker, label, "Score label not found");
            return None;
        };
        let value = parse_score(label, &raw);
        if value.is_none() {
            debug!(ticker, label, raw = %raw, "Score value not numeric");
        }
        value
    };

    ScoreBundle {
        piotroski_f: score(PIOTROSKI_LABEL),
        altman_z: score(ALTMAN_LABEL),
        beneish_m: score(BENEISH_LABEL),
    }
}
