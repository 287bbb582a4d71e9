// =============================================================================
// Signal Generator — The Brain of the engine
// =============================================================================
//
// Evaluates each (user, stock) pair once per signal cycle and produces a
// `TradingSignal`: gather data -> compute indicators -> vote -> gate against
// user preferences -> risk envelope -> news adjustment -> proposal. Votes are
// counted rather than weighted, so the outcome is easy to audit by hand.
// =============================================================================

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{EngineConfig, SignalProfile};
use crate::indicators::{bollinger, macd, rsi, sma};
use crate::news_analyzer::{self, NewsAggregate};
use crate::risk_envelope;
use crate::types::{
    Impact, NewsImpactSummary, OhlcvBar, Reason, SignalType, Stock, TradingSignal, UserPreferences,
};

const MIN_BARS: usize = 35; // covers SMA/EMA(long=21) plus RSI(14)+1 and room for MACD slow EMA(26)

#[derive(Debug, Clone, Copy)]
struct TechnicalVote {
    bullish: u8,
    bearish: u8,
}

/// Counts bullish/bearish votes from the indicator set.
fn technical_votes(closes: &[Decimal]) -> TechnicalVote {
    let mut bullish = 0u8;
    let mut bearish = 0u8;

    if let Some(value) = rsi::rsi(closes, 14) {
        if rsi::is_oversold(value) {
            bullish += 1;
        } else if rsi::is_overbought(value) {
            bearish += 1;
        }
    }

    if let Some(bb) = bollinger::bollinger(closes, 20, 2.0) {
        if let Some(&last) = closes.last() {
            if last < bb.lower {
                bullish += 1;
            } else if last > bb.upper {
                bearish += 1;
            }
        }
    }

    if closes.len() > 1 {
        let previous = &closes[..closes.len() - 1];

        if let (Some(prev_m), Some(m)) = (macd::macd(previous, 12, 26, 9), macd::macd(closes, 12, 26, 9)) {
            if macd::histogram_crossed_above_zero(prev_m.histogram, m.histogram) {
                bullish += 1;
            } else if macd::histogram_crossed_below_zero(prev_m.histogram, m.histogram) {
                bearish += 1;
            }
        }

        if let (Some(prev_short), Some(prev_long), Some(short), Some(long)) = (
            sma::sma(previous, 5),
            sma::sma(previous, 20),
            sma::sma(closes, 5),
            sma::sma(closes, 20),
        ) {
            if prev_short <= prev_long && short > long {
                bullish += 1;
            } else if prev_short >= prev_long && short < long {
                bearish += 1;
            }
        }
    }

    TechnicalVote { bullish, bearish }
}

fn preliminary_confidence(votes: u8) -> u8 {
    let raw = 50i32 + 10 * (votes as i32 - 3);
    raw.clamp(50, 90) as u8
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Applies the news-adjustment step to a preliminary (type, confidence) pair.
/// Returns the possibly-changed type, the new confidence, and whether the
/// candidate was modified.
fn apply_news_adjustment(
    candidate_type: SignalType,
    confidence: u8,
    news: Option<&NewsAggregate>,
    profile: SignalProfile,
    base_boost: u8,
) -> (SignalType, u8, bool, Option<NewsImpactSummary>) {
    let Some(news) = news else {
        return (candidate_type, confidence, false, None);
    };

    let summary = NewsImpactSummary {
        weighted_sentiment: news.weighted_sentiment,
        impact: news.impact,
        article_count: news.article_count,
    };

    if confidence == 0 {
        return (candidate_type, confidence, false, Some(summary));
    }

    let s = news.weighted_sentiment;
    let i = news.impact;
    let strong_impact = matches!(i, Impact::High | Impact::VeryHigh);
    let boost = (base_boost as f64 * profile.boost_multiplier() * if strong_impact { 1.5 } else { 1.0 }) as i32;

    let mut new_type = candidate_type;
    let mut new_confidence = confidence as i32;
    let mut modified = false;

    match candidate_type {
        SignalType::Buy => {
            if s >= 0.5 {
                new_confidence += boost;
                modified = true;
            } else if s <= -0.7 && strong_impact {
                new_type = SignalType::Hold;
                new_confidence = 0;
                modified = true;
            }
        }
        SignalType::Sell => {
            if s <= -0.5 {
                new_confidence += boost;
                modified = true;
            } else if s >= 0.7 && strong_impact {
                new_type = SignalType::Hold;
                new_confidence = 0;
                modified = true;
            }
        }
        SignalType::Hold => {
            if s.abs() >= 0.8 && matches!(i, Impact::VeryHigh) {
                new_type = if s > 0.0 { SignalType::Buy } else { SignalType::Sell };
                new_confidence = 50;
                modified = true;
            }
        }
    }

    let clamped = (new_confidence.max(0).min(100)) as u8;
    (new_type, clamped, modified, Some(summary))
}

pub struct SignalGenerationInput<'a> {
    pub stock: &'a Stock,
    pub user: &'a UserPreferences,
    pub bars: &'a [OhlcvBar],
    pub recent_avg_daily_volume: i64,
    pub news_articles: &'a [crate::types::NewsArticle],
    pub now: chrono::DateTime<chrono::Utc>,
    pub session_date: chrono::NaiveDate,
    pub open_signal_count_today: u32,
    pub config: &'a EngineConfig,
}

/// Produces one `TradingSignal` for the given input, or `None` if the stock
/// is ineligible entirely (not monitored, signal cap reached).
pub fn generate(input: &SignalGenerationInput) -> Option<TradingSignal> {
    let SignalGenerationInput {
        stock,
        user,
        bars,
        recent_avg_daily_volume,
        news_articles,
        now,
        session_date,
        open_signal_count_today,
        config,
    } = input;

    if !stock.is_monitored {
        return None;
    }
    if *recent_avg_daily_volume < user.min_daily_volume {
        return None;
    }
    if *open_signal_count_today >= user.max_signals_per_day {
        return None;
    }

    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let price_at_signal = match bars.last() {
        Some(b) => b.close,
        None => return None,
    };

    if closes.len() < MIN_BARS {
        return Some(hold_signal(
            user,
            stock,
            price_at_signal,
            *now,
            *session_date,
            Reason::InsufficientData,
        ));
    }

    let position_shares = risk_envelope::position_size_shares(user, price_at_signal);
    if price_at_signal * Decimal::from(position_shares) < user.min_position_value {
        debug!(symbol = %stock.symbol, "position value below minimum, skipping");
        return None;
    }

    let votes = technical_votes(&closes);
    let (mut signal_type, mut confidence, reason) = if votes.bullish >= 3 && votes.bullish > votes.bearish {
        (
            SignalType::Buy,
            preliminary_confidence(votes.bullish),
            Reason::TechnicalVotes { bullish: votes.bullish, bearish: votes.bearish },
        )
    } else if votes.bearish >= 3 && votes.bearish > votes.bullish {
        (
            SignalType::Sell,
            preliminary_confidence(votes.bearish),
            Reason::TechnicalVotes { bullish: votes.bullish, bearish: votes.bearish },
        )
    } else {
        (SignalType::Hold, 0, Reason::TechnicalVotes { bullish: votes.bullish, bearish: votes.bearish })
    };

    let news_agg = news_analyzer::aggregate(
        &stock.symbol,
        news_articles,
        *now,
        config.news.profile,
        &config.news.source_weights,
    );

    let (adjusted_type, adjusted_confidence, modified_by_news, news_impact) = apply_news_adjustment(
        signal_type,
        confidence,
        news_agg.as_ref(),
        config.signal_profile,
        config.news.confidence_boost,
    );
    signal_type = adjusted_type;
    confidence = adjusted_confidence;

    let final_reason = if modified_by_news && signal_type == SignalType::Hold {
        Reason::NewsVeto
    } else if modified_by_news {
        Reason::NewsAdjusted {
            detail: format!("sentiment adjustment applied (profile {:?})", config.signal_profile),
        }
    } else {
        reason
    };

    if confidence < user.min_confidence_threshold && signal_type != SignalType::Hold {
        signal_type = SignalType::Hold;
        confidence = 0;
    }

    if signal_type == SignalType::Hold {
        return Some(TradingSignal {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            symbol: stock.symbol.clone(),
            session_date: *session_date,
            created_at: *now,
            signal_type,
            confidence,
            price_at_signal,
            target_price: price_at_signal,
            stop_loss_price: price_at_signal,
            reason: final_reason,
            news_impact,
            modified_by_news,
            is_dispatched: false,
            dispatched_at: None,
            outcome: None,
        });
    }

    let envelope = risk_envelope::compute(user, signal_type, price_at_signal);

    let signal = TradingSignal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        symbol: stock.symbol.clone(),
        session_date: *session_date,
        created_at: *now,
        signal_type,
        confidence,
        price_at_signal,
        target_price: envelope.target_price,
        stop_loss_price: envelope.stop_loss_price,
        reason: final_reason,
        news_impact,
        modified_by_news,
        is_dispatched: false,
        dispatched_at: None,
        outcome: None,
    };

    info!(
        symbol = %signal.symbol,
        user = %signal.user_id,
        signal_type = ?signal.signal_type,
        confidence = signal.confidence,
        price = to_f64(signal.price_at_signal),
        "signal generated"
    );

    Some(signal)
}

fn hold_signal(
    user: &UserPreferences,
    stock: &Stock,
    price: Decimal,
    now: chrono::DateTime<chrono::Utc>,
    session_date: chrono::NaiveDate,
    reason: Reason,
) -> TradingSignal {
    TradingSignal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        symbol: stock.symbol.clone(),
        session_date,
        created_at: now,
        signal_type: SignalType::Hold,
        confidence: 0,
        price_at_signal: price,
        target_price: price,
        stop_loss_price: price,
        reason,
        news_impact: None,
        modified_by_news: false,
        is_dispatched: false,
        dispatched_at: None,
        outcome: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, TradingStyle};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn make_stock() -> Stock {
        Stock {
            symbol: "CDR".into(),
            name: "CD Projekt".into(),
            is_monitored: true,
            market: "GPW".into(),
            industry: "Gaming".into(),
        }
    }

    fn make_user() -> UserPreferences {
        UserPreferences {
            user_id: "u1".into(),
            available_capital: dec!(10000),
            target_profit_pct: None,
            max_loss_pct: None,
            min_confidence_threshold: 60,
            max_position_size_pct: dec!(0.1),
            min_position_value: dec!(100),
            min_daily_volume: 1000,
            trading_style: TradingStyle::Moderate,
            notification_channels: vec![Channel::Telegram],
            max_signals_per_day: 10,
            notify_on_hold: false,
            monitored_symbols: vec!["CDR".into()],
        }
    }

    fn ascending_bars(n: usize) -> Vec<OhlcvBar> {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let price = Decimal::from(100 + i as i64);
                OhlcvBar {
                    symbol: "CDR".into(),
                    timestamp: base + chrono::Duration::minutes(i as i64),
                    open: price,
                    high: price + dec!(1),
                    low: price - dec!(1),
                    close: price,
                    volume: 1000,
                }
            })
            .collect()
    }

    #[test]
    fn insufficient_bars_yields_hold_with_zero_confidence() {
        let stock = make_stock();
        let user = make_user();
        let bars = ascending_bars(5);
        let config = EngineConfig::default();
        let input = SignalGenerationInput {
            stock: &stock,
            user: &user,
            bars: &bars,
            recent_avg_daily_volume: 5000,
            news_articles: &[],
            now: Utc::now(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            open_signal_count_today: 0,
            config: &config,
        };
        let signal = generate(&input).unwrap();
        assert_eq!(signal.signal_type, SignalType::Hold);
        assert_eq!(signal.confidence, 0);
        assert_eq!(signal.reason, Reason::InsufficientData);
    }

    #[test]
    fn unmonitored_stock_is_skipped() {
        let mut stock = make_stock();
        stock.is_monitored = false;
        let user = make_user();
        let bars = ascending_bars(40);
        let config = EngineConfig::default();
        let input = SignalGenerationInput {
            stock: &stock,
            user: &user,
            bars: &bars,
            recent_avg_daily_volume: 5000,
            news_articles: &[],
            now: Utc::now(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            open_signal_count_today: 0,
            config: &config,
        };
        assert!(generate(&input).is_none());
    }

    #[test]
    fn signal_cap_blocks_generation() {
        let stock = make_stock();
        let user = make_user();
        let bars = ascending_bars(40);
        let config = EngineConfig::default();
        let input = SignalGenerationInput {
            stock: &stock,
            user: &user,
            bars: &bars,
            recent_avg_daily_volume: 5000,
            news_articles: &[],
            now: Utc::now(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            open_signal_count_today: 10,
            config: &config,
        };
        assert!(generate(&input).is_none());
    }

    #[test]
    fn buy_signal_price_invariants_hold() {
        let stock = make_stock();
        let user = make_user();
        let bars = ascending_bars(60);
        let config = EngineConfig::default();
        let input = SignalGenerationInput {
            stock: &stock,
            user: &user,
            bars: &bars,
            recent_avg_daily_volume: 5000,
            news_articles: &[],
            now: Utc::now(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            open_signal_count_today: 0,
            config: &config,
        };
        if let Some(signal) = generate(&input) {
            assert!(signal.check_price_invariants().is_ok());
        }
    }

    #[test]
    fn preliminary_confidence_is_clamped() {
        assert_eq!(preliminary_confidence(3), 50);
        assert_eq!(preliminary_confidence(4), 60);
        assert_eq!(preliminary_confidence(10), 90);
    }
}
