//! Hard filter chain applied to enriched overview records.
//!
//! Stages run in a fixed order, each narrowing the survivors:
//! Piotroski floor, Altman floor, Beneish ceiling, industry exclusion,
//! country exclusion. A missing score never passes its comparison. A
//! missing industry or country never matches its exclusion.

use tracing::{debug, info};

use crate::config::FilterConfig;
use crate::types::TickerRecord;

type Predicate = fn(&FilterEngine, &TickerRecord) -> bool;

pub struct FilterEngine {
    config: FilterConfig,
}

impl FilterEngine {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Keep the records that pass every stage, preserving input order.
    pub fn filter(&self, records: Vec<TickerRecord>) -> Vec<TickerRecord> {
        let stages: [(&str, Predicate); 5] = [
            ("piotroski", Self::passes_piotroski),
            ("altman", Self::passes_altman),
            ("beneish", Self::passes_beneish),
            ("industry", Self::passes_industry),
            ("country", Self::passes_country),
        ];

        let input = records.len();
        let mut survivors = records;

        for (stage, predicate) in stages {
            let before = survivors.len();
            survivors.retain(|r| predicate(self, r));
            debug!(stage, before, after = survivors.len(), "Filter stage applied");
        }

        for record in survivors.iter().take(5) {
            debug!(record = %record, "Filter survivor");
        }
        info!(input, remaining = survivors.len(), "Filters applied");

        survivors
    }

    fn passes_piotroski(&self, r: &TickerRecord) -> bool {
        r.scores
            .piotroski_f
            .is_some_and(|v| v >= self.config.min_piotroski)
    }

    fn passes_altman(&self, r: &TickerRecord) -> bool {
        r.scores.altman_z.is_some_and(|v| v >= self.config.min_altman)
    }

    fn passes_beneish(&self, r: &TickerRecord) -> bool {
        r.scores.beneish_m.is_some_and(|v| v <= self.config.max_beneish)
    }

    fn passes_industry(&self, r: &TickerRecord) -> bool {
        let needle = self.config.excluded_industry.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        !r.industry()
            .is_some_and(|industry| industry.to_lowercase().contains(&needle))
    }

    fn passes_country(&self, r: &TickerRecord) -> bool {
        let needle = self.config.excluded_country.as_str();
        if needle.is_empty() {
            return true;
        }
        !r.country().is_some_and(|country| country.contains(needle))
    }
}
