//! Finviz stock screener integration.
//!
//! Scrapes the public screener table. Filter names and option labels as
//! shown on the Finviz UI are translated to the short URL codes the
//! screener expects (`"Market Cap." = "+Mid (over $2bln)"` -> `cap_midover`).
//!
//! URL: `{base}/screener.ashx?v={view}&f={codes}&r={offset}`
//! Paging: 20 rows per page, `r` is the 1-based offset of the first row.
//! Past the last page Finviz repeats the final page, so paging stops on a
//! short page or a repeated first ticker.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::Screener;
use crate::config::{ScreenerConfig, DEFAULT_USER_AGENT};
use crate::types::{FilterCriteria, ScreenerError, TickerRecord, View, TICKER_COLUMN};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SCREENER_NAME: &str = "finviz";
const ROWS_PER_PAGE: usize = 20;

/// Table selectors, newest markup first.
const TABLE_SELECTORS: &[&str] = &["table.screener_table", "table.styled-table-new"];

fn view_code(view: View) -> &'static str {
    match view {
        View::Overview => "111",
        View::Valuation => "121",
        View::Financial => "161",
    }
}

// ---------------------------------------------------------------------------
// Filter translation
// ---------------------------------------------------------------------------

struct FinvizFilter {
    name: &'static str,
    prefix: &'static str,
    /// Named option label -> code.
    options: &'static [(&'static str, &'static str)],
    /// Accepts `"Under N"` / `"Over N"` (optionally with `%`) as `uN` / `oN`.
    thresholds: bool,
}

const FILTERS: &[FinvizFilter] = &[
    FinvizFilter {
        name: "Market Cap.",
        prefix: "cap",
        options: &[
            ("Mega ($200bln and more)", "mega"),
            ("Large ($10bln to $200bln)", "large"),
            ("Mid ($2bln to $10bln)", "mid"),
            ("Small ($300mln to $2bln)", "small"),
            ("Micro ($50mln to $300mln)", "micro"),
            ("Nano (under $50mln)", "nano"),
            ("+Large (over $10bln)", "largeover"),
            ("+Mid (over $2bln)", "midover"),
            ("+Small (over $300mln)", "smallover"),
            ("+Micro (over $50mln)", "microover"),
            ("-Large (under $200bln)", "largeunder"),
            ("-Mid (under $10bln)", "midunder"),
            ("-Small (under $2bln)", "smallunder"),
            ("-Micro (under $300mln)", "microunder"),
        ],
        thresholds: false,
    },
    FinvizFilter {
        name: "Price/Free Cash Flow",
        prefix: "fa_pfcf",
        options: &[("Low (<15)", "low"), ("High (>50)", "high")],
        thresholds: true,
    },
    FinvizFilter {
        name: "P/E",
        prefix: "fa_pe",
        options: &[
            ("Low (<15)", "low"),
            ("Profitable (>0)", "profitable"),
            ("High (>50)", "high"),
        ],
        thresholds: true,
    },
    FinvizFilter {
        name: "EPS growththis year",
        prefix: "fa_epsyoy",
        options: &[
            ("Negative (<0%)", "neg"),
            ("Positive (>0%)", "pos"),
            ("Positive Low (0-10%)", "poslow"),
            ("High (>25%)", "high"),
        ],
        thresholds: true,
    },
    FinvizFilter {
        name: "Return on Equity",
        prefix: "fa_roe",
        options: &[
            ("Positive (>0%)", "pos"),
            ("Negative (<0%)", "neg"),
            ("Very Positive (>30%)", "verypos"),
        ],
        thresholds: true,
    },
    FinvizFilter {
        name: "InstitutionalOwnership",
        prefix: "sh_instown",
        options: &[("Low (<5%)", "low"), ("High (>90%)", "high")],
        thresholds: true,
    },
    FinvizFilter {
        name: "Exchange",
        prefix: "exch",
        options: &[("AMEX", "amex"), ("NASDAQ", "nasd"), ("NYSE", "nyse")],
        thresholds: false,
    },
    FinvizFilter {
        name: "Country",
        prefix: "geo",
        options: &[("USA", "usa"), ("Foreign (ex-USA)", "notusa")],
        thresholds: false,
    },
];

/// Translate `"Under 40"` / `"Over 10%"` style labels.
fn threshold_code(value: &str) -> Option<String> {
    let (tag, rest) = if let Some(rest) = value.strip_prefix("Under ") {
        ("u", rest)
    } else if let Some(rest) = value.strip_prefix("Over ") {
        ("o", rest)
    } else {
        return None;
    };
    let number = rest.trim().trim_end_matches('%');
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    Some(format!("{tag}{number}"))
}

/// Translate criteria into the comma-separated `f=` parameter.
pub fn encode_criteria(criteria: &FilterCriteria) -> Result<String, ScreenerError> {
    let mut codes = Vec::with_capacity(criteria.len());

    for (name, value) in criteria.iter() {
        let unknown = || ScreenerError::UnknownFilter {
            name: name.to_string(),
            value: value.to_string(),
        };
        let filter = FILTERS.iter().find(|f| f.name == name).ok_or_else(unknown)?;

        let option = filter
            .options
            .iter()
            .find(|(label, _)| *label == value)
            .map(|(_, code)| code.to_string())
            .or_else(|| {
                if filter.thresholds {
                    threshold_code(value)
                } else {
                    None
                }
            })
            .ok_or_else(unknown)?;

        codes.push(format!("{}_{}", filter.prefix, option));
    }

    Ok(codes.join(","))
}

// ---------------------------------------------------------------------------
// Table parsing
// ---------------------------------------------------------------------------

fn selector(css: &str, view: View) -> Result<Selector, ScreenerError> {
    Selector::parse(css).map_err(|e| ScreenerError::Malformed {
        view,
        message: format!("invalid selector {css:?}: {e:?}"),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one screener result page into records.
///
/// The first row supplies column names. Rows whose cell count differs from
/// the header are skipped. The row counter column (`No.`) is dropped.
pub fn parse_screener_page(html: &str, view: View) -> Result<Vec<TickerRecord>, ScreenerError> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr", view)?;
    let cell_sel = selector("th, td", view)?;
    let table_sels = TABLE_SELECTORS
        .iter()
        .map(|css| selector(css, view))
        .collect::<Result<Vec<_>, _>>()?;

    let table = table_sels
        .iter()
        .find_map(|sel| document.select(sel).next())
        .ok_or_else(|| ScreenerError::Malformed {
            view,
            message: "screener table not found".to_string(),
        })?;

    let mut rows = table.select(&row_sel);
    let header: Vec<String> = match rows.next() {
        Some(row) => row.select(&cell_sel).map(cell_text).collect(),
        None => {
            return Err(ScreenerError::Malformed {
                view,
                message: "screener table has no header row".to_string(),
            })
        }
    };

    let ticker_idx = header
        .iter()
        .position(|h| h == TICKER_COLUMN)
        .ok_or_else(|| ScreenerError::Malformed {
            view,
            message: format!("no {TICKER_COLUMN} column in header {header:?}"),
        })?;

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.len() != header.len() {
            debug!(view = %view, cells = cells.len(), "Skipping non-data row");
            continue;
        }
        let ticker = cells[ticker_idx].clone();
        if ticker.is_empty() {
            continue;
        }

        let mut record = TickerRecord::new(ticker);
        for (name, value) in header.iter().zip(cells) {
            if name == "No." || name == TICKER_COLUMN {
                continue;
            }
            record.columns.insert(name.clone(), value);
        }
        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Finviz screener client.
pub struct FinvizClient {
    http: Client,
    base_url: String,
    max_pages: u32,
}

impl FinvizClient {
    pub fn new(config: &ScreenerConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .context("Failed to build HTTP client for Finviz")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_pages: config.max_pages.max(1),
        })
    }

    fn page_url(&self, view: View, filters: &str, offset: usize) -> String {
        format!(
            "{}/screener.ashx?v={}&f={}&r={}",
            self.base_url,
            view_code(view),
            urlencoding::encode(filters),
            offset,
        )
    }

    async fn fetch_page(&self, url: &str, view: View) -> Result<String, ScreenerError> {
        debug!(url = %url, "Fetching Finviz page");

        let unavailable = |message: String| ScreenerError::Unavailable { view, message };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status}")));
        }

        resp.text()
            .await
            .map_err(|e| unavailable(format!("failed to read body: {e}")))
    }
}

#[async_trait]
impl Screener for FinvizClient {
    async fn fetch(
        &self,
        view: View,
        criteria: &FilterCriteria,
    ) -> Result<Vec<TickerRecord>, ScreenerError> {
        let filters = encode_criteria(criteria)?;
        let mut all = Vec::new();
        let mut previous_first: Option<String> = None;

        for page in 0..self.max_pages as usize {
            let url = self.page_url(view, &filters, page * ROWS_PER_PAGE + 1);
            let html = self.fetch_page(&url, view).await?;
            let rows = parse_screener_page(&html, view)?;

            let first = rows.first().map(|r| r.ticker.clone());
            if first.is_some() && first == previous_first {
                break;
            }
            let short_page = rows.len() < ROWS_PER_PAGE;
            all.extend(rows);
            if short_page {
                return Ok(all);
            }
            previous_first = first;
        }

        if all.len() >= self.max_pages as usize * ROWS_PER_PAGE {
            warn!(view = %view, rows = all.len(), "Stopped at page cap; results may be truncated");
        }
        Ok(all)
    }

    fn name(&self) -> &str {
        SCREENER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
