// =============================================================================
// Price Collector — CSV-over-HTTP OHLCV ingestion
// =============================================================================
//
// A `reqwest::Client` with `#[instrument]` tracing and `anyhow::Context`-based
// error propagation. No request signing — this is a public CSV feed, not an
// authenticated broker API.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Warsaw;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::types::OhlcvBar;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

pub struct PriceCollectorClient {
    base_url: String,
    client: reqwest::Client,
}

impl PriceCollectorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Fetches and parses the latest OHLCV snapshot for `symbol`, retrying
    /// transient failures with exponential backoff. Malformed lines are
    /// dropped (counted) rather than aborting the whole batch.
    #[instrument(skip(self), fields(symbol))]
    pub async fn fetch_snapshot(&self, symbol: &str) -> Result<Vec<OhlcvBar>> {
        let url = format!("{}/quotes/{}.csv", self.base_url, symbol);

        let mut attempt = 0;
        loop {
            match self.try_fetch(&url, symbol).await {
                Ok(bars) => return Ok(bars),
                Err(err) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    let backoff = std::cmp::min(BASE_BACKOFF * attempt, MAX_BACKOFF);
                    warn!(symbol, attempt, error = %err, "transient price collector failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err).context("price collector exhausted retries"),
            }
        }
    }

    async fn try_fetch(&self, url: &str, symbol: &str) -> Result<Vec<OhlcvBar>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("non-success status {status} fetching {url}");
        }

        let body = resp.text().await.context("failed to read response body")?;
        Ok(parse_csv(&body, symbol))
    }
}

/// Parses `Date,Time,Open,High,Low,Close,Volume` CSV lines (source-local
/// time) into UTC-normalised bars. Malformed lines are skipped.
fn parse_csv(body: &str, symbol: &str) -> Vec<OhlcvBar> {
    let mut bars = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Date") {
            continue;
        }
        match parse_line(line, symbol) {
            Some(bar) => bars.push(bar),
            None => debug!(symbol, line, "dropping malformed CSV line"),
        }
    }

    bars
}

fn parse_line(line: &str, symbol: &str) -> Option<OhlcvBar> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 7 {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(
        &format!("{} {}", fields[0], fields[1]),
        "%Y-%m-%d %H:%M:%S",
    )
    .ok()?;
    // The feed reports GPW local time (Europe/Warsaw), not UTC.
    let timestamp = Warsaw.from_local_datetime(&naive).single()?.with_timezone(&Utc);

    let open: Decimal = fields[2].parse().ok()?;
    let high: Decimal = fields[3].parse().ok()?;
    let low: Decimal = fields[4].parse().ok()?;
    let close: Decimal = fields[5].parse().ok()?;
    let volume: i64 = fields[6].parse().ok()?;

    let bar = OhlcvBar {
        symbol: symbol.to_string(),
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    };

    bar.check_invariants().ok()?;
    Some(bar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_csv() {
        let body = "Date,Time,Open,High,Low,Close,Volume\n2026-03-02,10:00:00,265.00,266.50,264.80,265.20,120000\n";
        let bars = parse_csv(body, "CDR");
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].symbol, "CDR");
        assert_eq!(bars[0].volume, 120000);
    }

    #[test]
    fn drops_malformed_line_without_aborting_batch() {
        let body = "2026-03-02,10:00:00,265.00,266.50,264.80,265.20,120000\nbroken,line\n2026-03-02,10:01:00,265.20,266.00,264.90,265.50,80000\n";
        let bars = parse_csv(body, "CDR");
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn drops_line_violating_ohlc_invariant() {
        let body = "2026-03-02,10:00:00,265.00,260.00,264.80,265.20,120000\n";
        let bars = parse_csv(body, "CDR");
        assert!(bars.is_empty());
    }
}
