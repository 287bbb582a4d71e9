// =============================================================================
// Domain types — the GPW signal engine data model
// =============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub is_monitored: bool,
    pub market: String,
    pub industry: String,
}

// ---------------------------------------------------------------------------
// OHLCV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl OhlcvBar {
    /// Checks the OHLC-ordering invariant. Returns `Err` describing the
    /// violated clause instead of panicking, so callers can drop the bar.
    pub fn check_invariants(&self) -> Result<(), String> {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if !(self.low <= body_low && body_high <= self.high) {
            return Err(format!(
                "bar ohlc out of order: low={} open={} close={} high={}",
                self.low, self.open, self.close, self.high
            ));
        }
        if self.volume < 0 {
            return Err(format!("negative volume: {}", self.volume));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Session {
    pub date: chrono::NaiveDate,
    pub open_local: chrono::NaiveTime,
    pub close_local: chrono::NaiveTime,
    pub is_trading_day: bool,
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Impact {
    Minimal,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Impact {
    pub fn weight(&self) -> f64 {
        match self {
            Impact::VeryHigh => 2.0,
            Impact::High => 1.5,
            Impact::Medium => 1.0,
            Impact::Low => 0.6,
            Impact::Minimal => 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSentiment {
    pub symbol: String,
    pub sentiment_score: f64,
    pub confidence: f64,
    pub relevance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub overall_sentiment: Sentiment,
    pub sentiment_score: f64,
    pub confidence: f64,
    pub impact: Impact,
    pub per_stock: Vec<StockSentiment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub mentioned_stocks: HashSet<String>,
    #[serde(default)]
    pub classification: Option<Classification>,
}

// ---------------------------------------------------------------------------
// User preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingStyle {
    Conservative,
    Moderate,
    Aggressive,
    Scalping,
    Swing,
}

fn dec(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or_default()
}

impl TradingStyle {
    /// Default (target, stop) percentage pair before explicit overrides.
    pub fn default_target_stop_pct(&self) -> (Decimal, Decimal) {
        match self {
            TradingStyle::Conservative => (dec(0.015), dec(0.010)),
            TradingStyle::Moderate => (dec(0.030), dec(0.020)),
            TradingStyle::Aggressive => (dec(0.050), dec(0.035)),
            TradingStyle::Scalping => (dec(0.008), dec(0.006)),
            TradingStyle::Swing => (dec(0.070), dec(0.040)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub available_capital: Decimal,
    pub target_profit_pct: Option<Decimal>,
    pub max_loss_pct: Option<Decimal>,
    pub min_confidence_threshold: u8,
    pub max_position_size_pct: Decimal,
    pub min_position_value: Decimal,
    pub min_daily_volume: i64,
    pub trading_style: TradingStyle,
    pub notification_channels: Vec<Channel>,
    pub max_signals_per_day: u32,
    #[serde(default)]
    pub notify_on_hold: bool,
    #[serde(default)]
    pub monitored_symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Telegram,
    Email,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    InsufficientData,
    TechnicalVotes { bullish: u8, bearish: u8 },
    NewsAdjusted { detail: String },
    NewsVeto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsImpactSummary {
    pub weighted_sentiment: f64,
    pub impact: Impact,
    pub article_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    TargetHit,
    StopHit,
    ClosedAtSessionEnd,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub resolution: Resolution,
    pub exit_price: Decimal,
    pub exit_at: DateTime<Utc>,
    pub realised_return_pct: Decimal,
    pub holding_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub session_date: chrono::NaiveDate,
    pub created_at: DateTime<Utc>,
    pub signal_type: SignalType,
    pub confidence: u8,
    pub price_at_signal: Decimal,
    pub target_price: Decimal,
    pub stop_loss_price: Decimal,
    pub reason: Reason,
    pub news_impact: Option<NewsImpactSummary>,
    pub modified_by_news: bool,
    pub is_dispatched: bool,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub outcome: Option<SignalOutcome>,
}

impl TradingSignal {
    /// Checks the price-ordering invariant for non-hold signals.
    pub fn check_price_invariants(&self) -> Result<(), String> {
        match self.signal_type {
            SignalType::Buy => {
                if !(self.target_price > self.price_at_signal
                    && self.price_at_signal > self.stop_loss_price)
                {
                    return Err(format!(
                        "buy signal price order violated: target={} entry={} stop={}",
                        self.target_price, self.price_at_signal, self.stop_loss_price
                    ));
                }
            }
            SignalType::Sell => {
                if !(self.target_price < self.price_at_signal
                    && self.price_at_signal < self.stop_loss_price)
                {
                    return Err(format!(
                        "sell signal price order violated: target={} entry={} stop={}",
                        self.target_price, self.price_at_signal, self.stop_loss_price
                    ));
                }
            }
            SignalType::Hold => {}
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.outcome.is_none() && self.signal_type != SignalType::Hold
    }
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleKind {
    Price,
    News,
    Signals,
    Outcomes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleExecution {
    pub id: String,
    pub kind: ScheduleKind,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub items_processed: usize,
    pub error: Option<String>,
    pub error_kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Retrying,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDelivery {
    pub signal_id: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub attempted_at: DateTime<Utc>,
    pub provider_message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(low: f64, open: f64, close: f64, high: f64, volume: i64) -> OhlcvBar {
        OhlcvBar {
            symbol: "CDR".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            open: dec(open),
            high: dec(high),
            low: dec(low),
            close: dec(close),
            volume,
        }
    }

    #[test]
    fn bar_invariant_holds_for_well_formed_bar() {
        assert!(bar(10.0, 10.5, 10.8, 11.0, 100).check_invariants().is_ok());
    }

    #[test]
    fn bar_invariant_rejects_low_above_open() {
        assert!(bar(11.0, 10.5, 10.8, 12.0, 100).check_invariants().is_err());
    }

    #[test]
    fn bar_invariant_rejects_negative_volume() {
        assert!(bar(10.0, 10.5, 10.8, 11.0, -1).check_invariants().is_err());
    }

    #[test]
    fn buy_signal_price_order_checked() {
        let mut s = TradingSignal {
            id: "s1".into(),
            user_id: "u1".into(),
            symbol: "CDR".into(),
            session_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            signal_type: SignalType::Buy,
            confidence: 80,
            price_at_signal: dec(265.20),
            target_price: dec(273.16),
            stop_loss_price: dec(259.90),
            reason: Reason::TechnicalVotes { bullish: 4, bearish: 0 },
            news_impact: None,
            modified_by_news: false,
            is_dispatched: false,
            dispatched_at: None,
            outcome: None,
        };
        assert!(s.check_price_invariants().is_ok());
        s.target_price = dec(260.0);
        assert!(s.check_price_invariants().is_err());
    }
}
