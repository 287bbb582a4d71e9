// =============================================================================
// Dispatch templates — channel-specific rendering
// =============================================================================
//
// A signal is either delivered cleanly or not at all: rendering is a pure,
// infallible function so a send attempt never carries a partial message.
// =============================================================================

use crate::types::{SignalType, TradingSignal};

pub fn telegram_text(signal: &TradingSignal) -> String {
    let arrow = match signal.signal_type {
        SignalType::Buy => "\u{1F7E2} BUY",
        SignalType::Sell => "\u{1F534} SELL",
        SignalType::Hold => "\u{26AA} HOLD",
    };

    format!(
        "{arrow} {symbol}\nEntry: {entry}\nTarget: {target}\nStop: {stop}\nConfidence: {confidence}%\nReason: {reason:?}",
        symbol = signal.symbol,
        entry = signal.price_at_signal,
        target = signal.target_price,
        stop = signal.stop_loss_price,
        confidence = signal.confidence,
        reason = signal.reason,
    )
}

pub fn email_subject(signal: &TradingSignal) -> String {
    let action = match signal.signal_type {
        SignalType::Buy => "BUY",
        SignalType::Sell => "SELL",
        SignalType::Hold => "HOLD",
    };
    format!("[GPW] {symbol} {action} @ {price}", symbol = signal.symbol, price = signal.price_at_signal)
}

pub fn email_html(signal: &TradingSignal) -> String {
    format!(
        "<h2>{symbol} — {kind:?}</h2><table><tr><td>Entry</td><td>{entry}</td></tr><tr><td>Target</td><td>{target}</td></tr><tr><td>Stop</td><td>{stop}</td></tr><tr><td>Confidence</td><td>{confidence}%</td></tr></table>",
        symbol = signal.symbol,
        kind = signal.signal_type,
        entry = signal.price_at_signal,
        target = signal.target_price,
        stop = signal.stop_loss_price,
        confidence = signal.confidence,
    )
}

pub fn email_text(signal: &TradingSignal) -> String {
    format!(
        "{kind:?} {symbol}\nEntry: {entry}\nTarget: {target}\nStop: {stop}\nConfidence: {confidence}%",
        kind = signal.signal_type,
        symbol = signal.symbol,
        entry = signal.price_at_signal,
        target = signal.target_price,
        stop = signal.stop_loss_price,
        confidence = signal.confidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reason;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn signal() -> TradingSignal {
        TradingSignal {
            id: "s1".into(),
            user_id: "u1".into(),
            symbol: "CDR".into(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            created_at: Utc::now(),
            signal_type: SignalType::Buy,
            confidence: 82,
            price_at_signal: dec!(265.20),
            target_price: dec!(273.1560),
            stop_loss_price: dec!(259.8960),
            reason: Reason::TechnicalVotes { bullish: 4, bearish: 0 },
            news_impact: None,
            modified_by_news: false,
            is_dispatched: false,
            dispatched_at: None,
            outcome: None,
        }
    }

    #[test]
    fn telegram_text_contains_key_fields() {
        let text = telegram_text(&signal());
        assert!(text.contains("CDR"));
        assert!(text.contains("273.1560"));
        assert!(text.contains("82%"));
    }

    #[test]
    fn email_subject_names_symbol_action_and_price() {
        assert_eq!(email_subject(&signal()), "[GPW] CDR BUY @ 265.20");
    }

    #[test]
    fn email_html_contains_table_markup() {
        let html = email_html(&signal());
        assert!(html.contains("<table>"));
        assert!(html.contains("259.8960"));
    }
}
