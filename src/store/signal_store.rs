// =============================================================================
// SignalStore — open/closed signal lifecycle
// =============================================================================
//
// An `open`/`closed` split backed by `parking_lot::RwLock`, UUID-keyed
// records, and lifecycle transitions performed by moving a record between
// the two lists rather than mutating a status field in place.
// =============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{Resolution, SignalOutcome, SignalType, TradingSignal};

#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Inserts a new signal. The caller is responsible for deduplication
    /// before calling this (signal_generator.rs §4.8).
    async fn insert(&self, signal: TradingSignal) -> anyhow::Result<()>;

    /// Returns the still-open (non-hold, unresolved) signal for `(user, symbol)`
    /// with the given type, if any.
    async fn find_open(
        &self,
        user_id: &str,
        symbol: &str,
        signal_type: SignalType,
    ) -> anyhow::Result<Option<TradingSignal>>;

    /// Returns every open (unresolved, non-hold) signal, across all users.
    async fn list_open(&self) -> anyhow::Result<Vec<TradingSignal>>;

    /// Returns undispatched non-hold signals.
    async fn list_undispatched(&self) -> anyhow::Result<Vec<TradingSignal>>;

    /// Marks a signal dispatched.
    async fn mark_dispatched(&self, id: &str, at: chrono::DateTime<chrono::Utc>) -> anyhow::Result<()>;

    /// Attaches an outcome and moves the signal to the closed list atomically.
    async fn attach_outcome(&self, id: &str, outcome: SignalOutcome) -> anyhow::Result<()>;

    /// Counts non-hold signals created for `user_id` on `session_date`.
    async fn count_for_user_today(
        &self,
        user_id: &str,
        session_date: chrono::NaiveDate,
    ) -> anyhow::Result<u32>;
}

#[derive(Default)]
pub struct InMemorySignalStore {
    open: RwLock<Vec<TradingSignal>>,
    closed: RwLock<Vec<TradingSignal>>,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalStore for InMemorySignalStore {
    async fn insert(&self, signal: TradingSignal) -> anyhow::Result<()> {
        if signal.signal_type == SignalType::Hold {
            self.closed.write().push(signal);
        } else {
            self.open.write().push(signal);
        }
        Ok(())
    }

    async fn find_open(
        &self,
        user_id: &str,
        symbol: &str,
        signal_type: SignalType,
    ) -> anyhow::Result<Option<TradingSignal>> {
        let open = self.open.read();
        Ok(open
            .iter()
            .find(|s| s.user_id == user_id && s.symbol == symbol && s.signal_type == signal_type)
            .cloned())
    }

    async fn list_open(&self) -> anyhow::Result<Vec<TradingSignal>> {
        Ok(self.open.read().clone())
    }

    async fn list_undispatched(&self) -> anyhow::Result<Vec<TradingSignal>> {
        let open = self.open.read();
        Ok(open
            .iter()
            .filter(|s| !s.is_dispatched && s.signal_type != SignalType::Hold)
            .cloned()
            .collect())
    }

    async fn mark_dispatched(&self, id: &str, at: chrono::DateTime<chrono::Utc>) -> anyhow::Result<()> {
        let mut open = self.open.write();
        if let Some(s) = open.iter_mut().find(|s| s.id == id) {
            s.is_dispatched = true;
            s.dispatched_at = Some(at);
        }
        Ok(())
    }

    async fn attach_outcome(&self, id: &str, outcome: SignalOutcome) -> anyhow::Result<()> {
        let mut open = self.open.write();
        let idx = open
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| anyhow::anyhow!("no open signal with id {id}"))?;
        let mut signal = open.remove(idx);
        signal.outcome = Some(outcome);
        self.closed.write().push(signal);
        Ok(())
    }

    async fn count_for_user_today(
        &self,
        user_id: &str,
        session_date: chrono::NaiveDate,
    ) -> anyhow::Result<u32> {
        let open_count = self
            .open
            .read()
            .iter()
            .filter(|s| s.user_id == user_id && s.session_date == session_date)
            .count();
        let closed_count = self
            .closed
            .read()
            .iter()
            .filter(|s| {
                s.user_id == user_id
                    && s.session_date == session_date
                    && s.signal_type != SignalType::Hold
            })
            .count();
        Ok((open_count + closed_count) as u32)
    }
}

/// Supersedes a still-open signal: moves it to closed with resolution
/// `Cancelled`. Used by the signal generator's opposite-direction re-emission
/// path, so a user never holds two live open signals for the same stock.
pub async fn supersede(
    store: &dyn SignalStore,
    existing: &TradingSignal,
    now: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<()> {
    store
        .attach_outcome(
            &existing.id,
            SignalOutcome {
                resolution: Resolution::Cancelled,
                exit_price: existing.price_at_signal,
                exit_at: now,
                realised_return_pct: rust_decimal::Decimal::ZERO,
                holding_minutes: (now - existing.created_at).num_minutes(),
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reason;
    use chrono::TimeZone;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn signal(user: &str, symbol: &str, kind: SignalType) -> TradingSignal {
        TradingSignal {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.into(),
            symbol: symbol.into(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            signal_type: kind,
            confidence: 80,
            price_at_signal: dec!(100),
            target_price: dec!(103),
            stop_loss_price: dec!(98),
            reason: Reason::TechnicalVotes { bullish: 4, bearish: 0 },
            news_impact: None,
            modified_by_news: false,
            is_dispatched: false,
            dispatched_at: None,
            outcome: None,
        }
    }

    #[tokio::test]
    async fn insert_and_find_open_roundtrip() {
        let store = InMemorySignalStore::new();
        store.insert(signal("u1", "CDR", SignalType::Buy)).await.unwrap();
        let found = store.find_open("u1", "CDR", SignalType::Buy).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn attach_outcome_moves_to_closed() {
        let store = InMemorySignalStore::new();
        let s = signal("u1", "CDR", SignalType::Buy);
        let id = s.id.clone();
        store.insert(s).await.unwrap();
        store
            .attach_outcome(
                &id,
                SignalOutcome {
                    resolution: Resolution::TargetHit,
                    exit_price: dec!(103),
                    exit_at: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
                    realised_return_pct: dec!(3.0),
                    holding_minutes: 150,
                },
            )
            .await
            .unwrap();
        assert!(store.find_open("u1", "CDR", SignalType::Buy).await.unwrap().is_none());
        assert!(store.list_open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn supersede_cancels_prior_signal() {
        let store = InMemorySignalStore::new();
        let s = signal("u1", "KGH", SignalType::Buy);
        store.insert(s.clone()).await.unwrap();
        supersede(&store, &s, Utc.with_ymd_and_hms(2026, 3, 2, 11, 30, 0).unwrap())
            .await
            .unwrap();
        assert!(store.find_open("u1", "KGH", SignalType::Buy).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn count_for_user_today_counts_open_and_closed_non_hold() {
        let store = InMemorySignalStore::new();
        store.insert(signal("u1", "CDR", SignalType::Buy)).await.unwrap();
        store.insert(signal("u1", "PKN", SignalType::Sell)).await.unwrap();
        store.insert(signal("u1", "ABC", SignalType::Hold)).await.unwrap();
        let count = store
            .count_for_user_today("u1", chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
