//! Result output.
//!
//! Writes the final ticker list as plain text, one symbol per line, and
//! optionally a JSON dump of the ranked records for inspection.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::RankedRecord;

/// Write tickers one per line, overwriting `path`.
///
/// Every line, including the last, ends with `\n`. An empty list produces
/// an empty file.
pub fn write_tickers<S: AsRef<str>>(tickers: &[S], path: &Path) -> Result<()> {
    let total = tickers.len();
    let mut contents = String::new();

    for (i, ticker) in tickers.iter().enumerate() {
        let ticker = ticker.as_ref();
        info!(progress = format!("{}/{}", i + 1, total), ticker, "Writing to file");
        contents.push_str(ticker);
        contents.push('\n');
    }

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write tickers to {}", path.display()))?;

    info!(path = %path.display(), count = total, "Ticker list written");
    Ok(())
}

/// Write ranked records as pretty JSON, overwriting `path`.
pub fn write_report(records: &[RankedRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialise ranked records")?;

    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    debug!(path = %path.display(), count = records.len(), "Ranked report written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
