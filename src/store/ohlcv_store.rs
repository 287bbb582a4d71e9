// =============================================================================
// OHLCVStore — append-only bar repository
// =============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::OhlcvBar;

#[async_trait]
pub trait OhlcvStore: Send + Sync {
    /// Appends a bar. Silently ignores duplicates keyed by `(symbol, timestamp)`.
    async fn append(&self, bar: OhlcvBar) -> anyhow::Result<()>;

    /// Returns the latest `n` bars for `symbol`, oldest first.
    async fn latest(&self, symbol: &str, n: usize) -> anyhow::Result<Vec<OhlcvBar>>;

    /// Returns bars for `symbol` strictly between `from` (exclusive) and `to` (inclusive).
    async fn between(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<OhlcvBar>>;
}

/// In-memory reference implementation: an append-only `RwLock<Vec<_>>`.
#[derive(Default)]
pub struct InMemoryOhlcvStore {
    bars: RwLock<Vec<OhlcvBar>>,
}

impl InMemoryOhlcvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OhlcvStore for InMemoryOhlcvStore {
    async fn append(&self, bar: OhlcvBar) -> anyhow::Result<()> {
        let mut bars = self.bars.write();
        let exists = bars
            .iter()
            .any(|b| b.symbol == bar.symbol && b.timestamp == bar.timestamp);
        if !exists {
            bars.push(bar);
            bars.sort_by_key(|b| b.timestamp);
        }
        Ok(())
    }

    async fn latest(&self, symbol: &str, n: usize) -> anyhow::Result<Vec<OhlcvBar>> {
        let bars = self.bars.read();
        let mut matching: Vec<OhlcvBar> = bars
            .iter()
            .filter(|b| b.symbol == symbol)
            .cloned()
            .collect();
        if matching.len() > n {
            matching = matching.split_off(matching.len() - n);
        }
        Ok(matching)
    }

    async fn between(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<OhlcvBar>> {
        let bars = self.bars.read();
        Ok(bars
            .iter()
            .filter(|b| b.symbol == symbol && b.timestamp > from && b.timestamp <= to)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(ts: DateTime<Utc>) -> OhlcvBar {
        OhlcvBar {
            symbol: "CDR".into(),
            timestamp: ts,
            open: dec!(10),
            high: dec!(11),
            low: dec!(9),
            close: dec!(10.5),
            volume: 100,
        }
    }

    #[tokio::test]
    async fn append_is_idempotent_by_symbol_and_timestamp() {
        let store = InMemoryOhlcvStore::new();
        let ts = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        store.append(bar(ts)).await.unwrap();
        store.append(bar(ts)).await.unwrap();
        let latest = store.latest("CDR", 10).await.unwrap();
        assert_eq!(latest.len(), 1);
    }

    #[tokio::test]
    async fn latest_returns_most_recent_n_in_order() {
        let store = InMemoryOhlcvStore::new();
        for i in 0..5 {
            let ts = Utc.with_ymd_and_hms(2026, 3, 2, 10, i, 0).unwrap();
            store.append(bar(ts)).await.unwrap();
        }
        let latest = store.latest("CDR", 3).await.unwrap();
        assert_eq!(latest.len(), 3);
        assert!(latest[0].timestamp < latest[2].timestamp);
    }
}
