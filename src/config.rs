//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the file named by `SCREENER_CONFIG`) and
//! deserializes it into strongly-typed structs. Every section carries
//! defaults so a partial file, or an empty one, yields a runnable setup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

use crate::types::FilterCriteria;

/// Env var that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "SCREENER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Browser identity sent to the score site; default client strings get blocked.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub screener: ScreenerConfig,
    pub scores: ScoresConfig,
    pub enrichment: EnrichmentConfig,
    pub filters: FilterConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScreenerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Safety cap on result pages fetched per view.
    pub max_pages: u32,
    /// Filter name -> expression, shared by all three views.
    pub criteria: BTreeMap<String, String>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        let criteria = [
            ("Price/Free Cash Flow", "Under 40"),
            ("InstitutionalOwnership", "Under 80%"),
            ("EPS growththis year", "Over 10%"),
            ("Market Cap.", "+Mid (over $2bln)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            base_url: "https://finviz.com".to_string(),
            timeout_secs: 30,
            max_pages: 500,
            criteria,
        }
    }
}

impl ScreenerConfig {
    pub fn filter_criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.criteria.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoresConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Parse 403 responses as if they were 200. The score site answers
    /// some blocked clients with 403 but still serves the page body.
    pub accept_forbidden: bool,
}

impl Default for ScoresConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.gurufocus.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            accept_forbidden: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub max_attempts: u32,
    pub backoff_secs: f64,
    /// Concurrent score fetches. 1 keeps the run strictly sequential.
    pub workers: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 2.0,
            workers: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub min_piotroski: f64,
    pub min_altman: f64,
    pub max_beneish: f64,
    /// Dropped when contained in the industry, ignoring case.
    pub excluded_industry: String,
    /// Dropped when contained in the country, case-sensitive.
    pub excluded_country: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_piotroski: 6.0,
            min_altman: 1.81,
            max_beneish: -1.78,
            excluded_industry: "bank".to_string(),
            excluded_country: "China".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    /// Keep only the top N ranked tickers.
    pub limit: Option<usize>,
    /// Optional JSON dump of the ranked records.
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "sorted_filtered_tickers.txt".to_string(),
            limit: None,
            report_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path from `SCREENER_CONFIG`, falling back to
    /// `config.toml`.
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.enrichment.max_attempts == 0 {
            anyhow::bail!("enrichment.max_attempts must be at least 1");
        }
        if self.enrichment.workers == 0 {
            anyhow::bail!("enrichment.workers must be at least 1");
        }
        if !self.enrichment.backoff_secs.is_finite() || self.enrichment.backoff_secs < 0.0 {
            anyhow::bail!("enrichment.backoff_secs must be a non-negative number");
        }
        Ok(())
    }
}
