//! Both HTTP clients against a local server with canned pages.

use std::sync::Arc;

use fundascreen::config::{EnrichmentConfig, ScoresConfig, ScreenerConfig};
use fundascreen::engine::enricher::{Enricher, TickerStatus};
use fundascreen::scores::gurufocus::GuruFocusClient;
use fundascreen::scores::ScoreSource;
use fundascreen::screener::finviz::FinvizClient;
use fundascreen::screener::Screener;
use fundascreen::types::{FilterCriteria, ScrapeError, ScreenerError, TickerRecord, View};

use crate::http_stub::{Canned, StubServer};

// ---------------------------------------------------------------------------
// Score pages
// ---------------------------------------------------------------------------

const SCORE_PAGE: &str = r#"<html><body><table>
    <tr><td>Piotroski F-Score</td><td>7/9</td></tr>
    <tr><td>Altman Z-Score</td><td>2.5</td></tr>
    <tr><td>Beneish M-Score</td><td>-2.4</td></tr>
</table></body></html>"#;

fn score_client(server: &StubServer, accept_forbidden: bool) -> GuruFocusClient {
    GuruFocusClient::new(&ScoresConfig {
        base_url: server.base_url.clone(),
        timeout_secs: 5,
        accept_forbidden,
        ..ScoresConfig::default()
    })
    .unwrap()
}

async fn fetch_with_status(
    status: u16,
    accept_forbidden: bool,
) -> Result<Option<fundascreen::types::ScoreBundle>, ScrapeError> {
    let server = StubServer::start(move |_| Canned::new(status, SCORE_PAGE)).await;
    score_client(&server, accept_forbidden).fetch_scores("BRK-B").await
}

#[tokio::test]
async fn test_score_page_ok_is_parsed() {
    let server = StubServer::start(|_| Canned::new(200, SCORE_PAGE)).await;
    let bundle = score_client(&server, true)
        .fetch_scores("BRK-B")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(bundle.piotroski_f, Some(7.0));
    assert_eq!(bundle.altman_z, Some(2.5));
    assert_eq!(bundle.beneish_m, Some(-2.4));
    assert_eq!(server.paths(), vec!["/stock/BRK.B/summary".to_string()]);
}

#[tokio::test]
async fn test_score_page_forbidden_follows_policy() {
    let lenient = fetch_with_status(403, true).await.unwrap();
    assert_eq!(lenient.and_then(|b| b.piotroski_f), Some(7.0));

    let strict = fetch_with_status(403, false).await;
    assert!(matches!(strict, Ok(None)));
}

#[tokio::test]
async fn test_score_page_other_statuses_are_no_data() {
    for status in [404, 500, 503] {
        let result = fetch_with_status(status, true).await;
        assert!(matches!(result, Ok(None)), "status {status}");
    }
}

#[tokio::test]
async fn test_score_page_without_scores_is_unscored() {
    let server = StubServer::start(|_| Canned::new(200, "<html><p>nothing</p></html>")).await;
    let bundle = score_client(&server, true)
        .fetch_scores("AAPL")
        .await
        .unwrap()
        .unwrap();
    assert!(!bundle.is_complete());
    assert_eq!(bundle.piotroski_f, None);
}

#[tokio::test]
async fn test_body_read_failure_is_retried() {
    let server = StubServer::start(|_| Canned::new(200, SCORE_PAGE).truncated()).await;
    let client = score_client(&server, true);

    let err = client.fetch_scores("AAPL").await.unwrap_err();
    assert!(matches!(err, ScrapeError::Body { ref ticker, .. } if ticker == "AAPL"));

    let enricher = Enricher::new(
        Arc::new(client),
        &EnrichmentConfig {
            max_attempts: 3,
            backoff_secs: 0.0,
            workers: 1,
        },
    );
    let mut records = vec![TickerRecord::new("AAPL")];
    let report = enricher.enrich_batch(&mut records).await;

    let outcome = report.outcome("AAPL").unwrap();
    assert_eq!((outcome.attempts, outcome.status), (3, TickerStatus::Exhausted));
    // One direct call plus three enricher attempts.
    assert_eq!(server.hits(), 4);
    assert!(!records[0].scores.is_complete());
}

// ---------------------------------------------------------------------------
// Screener paging
// ---------------------------------------------------------------------------

const ROWS_PER_PAGE: usize = 20;

fn offset_param(path: &str) -> usize {
    path.split("r=")
        .nth(1)
        .and_then(|s| s.split('&').next())
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
}

/// Finviz-style page for a result set of `total` rows. Offsets past the end
/// repeat the final page.
fn screener_page(total: usize, path: &str) -> String {
    let mut start = offset_param(path);
    if start > total && total > 0 {
        start = ((total - 1) / ROWS_PER_PAGE) * ROWS_PER_PAGE + 1;
    }
    let end = (start + ROWS_PER_PAGE - 1).min(total);

    let mut html = String::from(
        r#"<html><body><table class="screener_table">
        <tr><th>No.</th><th>Ticker</th><th>Industry</th><th>Country</th></tr>"#,
    );
    for n in start..=end {
        html.push_str(&format!(
            "<tr><td>{n}</td><td><a>T{n:03}</a></td><td>Software</td><td>USA</td></tr>"
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn finviz_client(server: &StubServer, max_pages: u32) -> FinvizClient {
    FinvizClient::new(&ScreenerConfig {
        base_url: server.base_url.clone(),
        timeout_secs: 5,
        max_pages,
        ..ScreenerConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_paging_stops_on_repeated_final_page() {
    let server = StubServer::start(|path| Canned::new(200, screener_page(40, path))).await;
    let rows = finviz_client(&server, 500)
        .fetch(View::Overview, &FilterCriteria::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 40);
    assert_eq!(rows[0].ticker, "T001");
    assert_eq!(rows[39].ticker, "T040");
    assert_eq!(server.hits(), 3);

    let offsets: Vec<usize> = server.paths().iter().map(|p| offset_param(p)).collect();
    assert_eq!(offsets, vec![1, 21, 41]);
    assert!(server.paths()[0].starts_with("/screener.ashx?v=111"));
}

#[tokio::test]
async fn test_paging_stops_on_short_page() {
    let server = StubServer::start(|path| Canned::new(200, screener_page(25, path))).await;
    let rows = finviz_client(&server, 500)
        .fetch(View::Valuation, &FilterCriteria::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 25);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_paging_respects_page_cap() {
    let server = StubServer::start(|path| Canned::new(200, screener_page(10_000, path))).await;
    let rows = finviz_client(&server, 3)
        .fetch(View::Financial, &FilterCriteria::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 60);
    assert_eq!(rows[59].ticker, "T060");
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_screener_error_status_is_unavailable() {
    let server = StubServer::start(|_| Canned::new(500, "oops")).await;
    let err = finviz_client(&server, 500)
        .fetch(View::Overview, &FilterCriteria::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ScreenerError::Unavailable { view: View::Overview, .. }));
    assert_eq!(server.hits(), 1);
}
