// =============================================================================
// Outcome Tracker — intraday signal resolution
// =============================================================================
//
// Scans each open signal's bars in priority order (target before stop) and
// resolves it to a target-hit, stop-hit, or session-close outcome. A small
// buffer of resolved records is built up before the store is updated, so the
// lock isn't held across the whole scan. Profit-lock/breakeven/progressive
// trailing-stop tightening are out of scope here — this is a flat
// target/stop/session-close resolver only.
// =============================================================================

use rust_decimal::Decimal;
use tracing::info;

use crate::types::{OhlcvBar, Resolution, SignalOutcome, SignalType, TradingSignal};

/// Resolves a single open signal against bars strictly after its creation.
/// `bars` must be sorted ascending by timestamp and contain only bars for
/// the signal's own symbol. `session_close` is the last bar's timestamp if
/// it is known to be the final bar of the session, else `None`.
pub fn resolve(signal: &TradingSignal, bars: &[OhlcvBar], is_session_close: bool) -> Option<SignalOutcome> {
    for bar in bars {
        if bar.timestamp <= signal.created_at {
            continue;
        }

        let (target_hit, stop_hit) = match signal.signal_type {
            SignalType::Buy => (bar.high >= signal.target_price, bar.low <= signal.stop_loss_price),
            SignalType::Sell => (bar.low <= signal.target_price, bar.high >= signal.stop_loss_price),
            SignalType::Hold => return None,
        };

        if target_hit {
            return Some(make_outcome(signal, Resolution::TargetHit, signal.target_price, bar.timestamp));
        }
        if stop_hit {
            return Some(make_outcome(signal, Resolution::StopHit, signal.stop_loss_price, bar.timestamp));
        }
    }

    if is_session_close {
        if let Some(last) = bars.last() {
            return Some(make_outcome(signal, Resolution::ClosedAtSessionEnd, last.close, last.timestamp));
        }
    }

    None
}

fn make_outcome(
    signal: &TradingSignal,
    resolution: Resolution,
    exit_price: Decimal,
    exit_at: chrono::DateTime<chrono::Utc>,
) -> SignalOutcome {
    let direction = match signal.signal_type {
        SignalType::Buy => Decimal::ONE,
        SignalType::Sell => Decimal::from(-1),
        SignalType::Hold => Decimal::ZERO,
    };
    let realised_return_pct = if signal.price_at_signal != Decimal::ZERO {
        (direction * (exit_price - signal.price_at_signal) / signal.price_at_signal * Decimal::from(100))
            .round_dp(4)
    } else {
        Decimal::ZERO
    };

    let outcome = SignalOutcome {
        resolution,
        exit_price,
        exit_at,
        realised_return_pct,
        holding_minutes: (exit_at - signal.created_at).num_minutes(),
    };

    info!(
        symbol = %signal.symbol,
        signal_id = %signal.id,
        resolution = ?outcome.resolution,
        realised_return_pct = %outcome.realised_return_pct,
        "signal resolved"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reason;
    use chrono::TimeZone;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn signal(signal_type: SignalType, created_at: chrono::DateTime<chrono::Utc>) -> TradingSignal {
        TradingSignal {
            id: "s1".into(),
            user_id: "u1".into(),
            symbol: "CDR".into(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            created_at,
            signal_type,
            confidence: 80,
            price_at_signal: dec!(265.20),
            target_price: dec!(273.1560),
            stop_loss_price: dec!(259.8960),
            reason: Reason::TechnicalVotes { bullish: 4, bearish: 0 },
            news_impact: None,
            modified_by_news: false,
            is_dispatched: true,
            dispatched_at: Some(created_at),
            outcome: None,
        }
    }

    fn bar(hour: u32, minute: u32, high: Decimal, low: Decimal, close: Decimal) -> OhlcvBar {
        OhlcvBar {
            symbol: "CDR".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 100,
        }
    }

    #[test]
    fn target_hit_resolves_first_in_timestamp_order() {
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let s = signal(SignalType::Buy, created);
        let bars = vec![
            bar(10, 0, dec!(266), dec!(264), dec!(265)),
            bar(12, 5, dec!(273.40), dec!(265), dec!(273.2)),
        ];
        let outcome = resolve(&s, &bars, false).unwrap();
        assert_eq!(outcome.resolution, Resolution::TargetHit);
        assert_eq!(outcome.exit_price, dec!(273.1560));
        assert_eq!(outcome.holding_minutes, 155);
    }

    #[test]
    fn stop_hit_resolves_before_target() {
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let s = signal(SignalType::Buy, created);
        let bars = vec![bar(10, 15, dec!(266), dec!(259.50), dec!(260))];
        let outcome = resolve(&s, &bars, false).unwrap();
        assert_eq!(outcome.resolution, Resolution::StopHit);
        assert_eq!(outcome.exit_price, dec!(259.8960));
    }

    #[test]
    fn closes_at_session_end_when_neither_fires() {
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let mut s = signal(SignalType::Sell, created);
        s.price_at_signal = dec!(86.91);
        s.target_price = dec!(84.30);
        s.stop_loss_price = dec!(88.65);
        let bars = vec![bar(17, 0, dec!(86.80), dec!(86.20), dec!(86.50))];
        let outcome = resolve(&s, &bars, true).unwrap();
        assert_eq!(outcome.resolution, Resolution::ClosedAtSessionEnd);
        assert_eq!(outcome.exit_price, dec!(86.50));
    }

    #[test]
    fn no_bars_after_creation_yields_none() {
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 16, 59, 0).unwrap();
        let s = signal(SignalType::Buy, created);
        let bars = vec![bar(16, 0, dec!(266), dec!(264), dec!(265))];
        assert!(resolve(&s, &bars, false).is_none());
    }
}
