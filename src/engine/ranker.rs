//! Merge the three screener views and compute the composite rank.
//!
//! The filtered overview rows are inner-joined with the financial view and
//! then with the valuation view on the exact ticker symbol. Three metrics
//! are ranked independently with fractional ranking and summed; the result
//! is stable-sorted so equal totals keep join order.

use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::{
    RankedRecord, TickerRecord, EPS_GROWTH_COLUMN, PRICE_TO_FCF_COLUMN, PROFIT_MARGIN_COLUMN,
};

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Inner join on ticker.
///
/// Output follows `left` order; a left row matching several right rows
/// yields one row per match in `right` order. On column name clashes the
/// left value is kept. Scores come from the left row.
pub fn inner_join(left: &[TickerRecord], right: &[TickerRecord]) -> Vec<TickerRecord> {
    let mut index: HashMap<&str, Vec<&TickerRecord>> = HashMap::new();
    for row in right {
        index.entry(row.ticker.as_str()).or_default().push(row);
    }

    let mut joined = Vec::with_capacity(left.len());
    for l in left {
        let Some(matches) = index.get(l.ticker.as_str()) else {
            debug!(ticker = %l.ticker, "No join partner, dropped");
            continue;
        };
        for r in matches {
            let mut merged = l.clone();
            for (name, value) in &r.columns {
                merged
                    .columns
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            joined.push(merged);
        }
    }

    joined
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Rank 1 = largest value.
    Descending,
    /// Rank 1 = smallest value.
    Ascending,
}

/// Fractional ("average") ranks, 1-based.
///
/// Tied values share the mean of the positions they occupy. Missing values
/// are placed after every present value and share the mean of the trailing
/// positions.
pub fn fractional_rank(values: &[Option<f64>], direction: Direction) -> Vec<f64> {
    let mut ranks = vec![0.0; values.len()];

    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    present.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        match direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });

    let mut start = 0;
    while start < present.len() {
        let mut end = start + 1;
        while end < present.len() && present[end].1 == present[start].1 {
            end += 1;
        }
        // Positions start+1 ..= end.
        let rank = (start + 1 + end) as f64 / 2.0;
        for &(i, _) in &present[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }

    let first_missing = present.len() + 1;
    let last = values.len();
    if first_missing <= last {
        let rank = (first_missing + last) as f64 / 2.0;
        for (i, v) in values.iter().enumerate() {
            if v.is_none() {
                ranks[i] = rank;
            }
        }
    }

    ranks
}

// ---------------------------------------------------------------------------
// Merge + rank
// ---------------------------------------------------------------------------

/// Join the views, rank profit margin (desc), EPS growth (desc) and P/FCF
/// (asc), and sort ascending by the summed rank.
pub fn merge_and_rank(
    overview: &[TickerRecord],
    financial: &[TickerRecord],
    valuation: &[TickerRecord],
) -> Vec<RankedRecord> {
    let merged = inner_join(&inner_join(overview, financial), valuation);

    let profit: Vec<Option<f64>> = merged.iter().map(|r| r.numeric(PROFIT_MARGIN_COLUMN)).collect();
    let eps: Vec<Option<f64>> = merged.iter().map(|r| r.numeric(EPS_GROWTH_COLUMN)).collect();
    let pfcf: Vec<Option<f64>> = merged.iter().map(|r| r.numeric(PRICE_TO_FCF_COLUMN)).collect();

    let profit_rank = fractional_rank(&profit, Direction::Descending);
    let eps_rank = fractional_rank(&eps, Direction::Descending);
    let pfcf_rank = fractional_rank(&pfcf, Direction::Ascending);

    let mut ranked: Vec<RankedRecord> = merged
        .into_iter()
        .enumerate()
        .map(|(i, r)| RankedRecord {
            ticker: r.ticker,
            columns: r.columns,
            scores: r.scores,
            profit_margin: profit[i],
            eps_growth: eps[i],
            price_to_fcf: pfcf[i],
            profit_margin_rank: profit_rank[i],
            eps_growth_rank: eps_rank[i],
            price_to_fcf_rank: pfcf_rank[i],
            total_rank: profit_rank[i] + eps_rank[i] + pfcf_rank[i],
        })
        .collect();

    // `sort_by` is stable: equal totals keep join order.
    ranked.sort_by(|a, b| {
        a.total_rank
            .partial_cmp(&b.total_rank)
            .unwrap_or(Ordering::Equal)
    });

    let missing = ranked
        .iter()
        .filter(|r| r.profit_margin.is_none() || r.eps_growth.is_none() || r.price_to_fcf.is_none())
        .count();
    info!(
        overview = overview.len(),
        merged = ranked.len(),
        with_missing_metrics = missing,
        "Merge and rank complete"
    );
    for r in ranked.iter().take(5) {
        debug!(record = %r, "Top ranked");
    }

    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
