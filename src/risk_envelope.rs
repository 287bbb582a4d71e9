// =============================================================================
// Risk Envelope — target/stop pricing and position sizing
// =============================================================================
//
// Target/stop percentages come from a `TradingStyle` match table, overridden
// by the user's explicit preferences when present. Position size is a
// capital-fraction sizing: cap the position value, then floor to whole
// shares. Circuit breakers (daily loss, consecutive losses, drawdown,
// trade-count caps) are out of scope for this pipeline and live elsewhere.
// =============================================================================

use rust_decimal::Decimal;

use crate::types::{SignalType, UserPreferences};

pub struct RiskEnvelope {
    pub target_price: Decimal,
    pub stop_loss_price: Decimal,
    pub position_size_shares: i64,
}

/// Derives `targetPrice`/`stopLossPrice` from the user's trading style
/// (overridden by explicit preference fields) and quantises position size
/// to whole shares.
pub fn compute(
    user: &UserPreferences,
    signal_type: SignalType,
    price_at_signal: Decimal,
) -> RiskEnvelope {
    let (default_target_pct, default_stop_pct) = user.trading_style.default_target_stop_pct();
    let target_pct = user.target_profit_pct.unwrap_or(default_target_pct);
    let stop_pct = user.max_loss_pct.unwrap_or(default_stop_pct);

    let (target_price, stop_loss_price) = match signal_type {
        SignalType::Buy => (
            (price_at_signal * (Decimal::ONE + target_pct)).round_dp(4),
            (price_at_signal * (Decimal::ONE - stop_pct)).round_dp(4),
        ),
        SignalType::Sell => (
            (price_at_signal * (Decimal::ONE - target_pct)).round_dp(4),
            (price_at_signal * (Decimal::ONE + stop_pct)).round_dp(4),
        ),
        SignalType::Hold => (price_at_signal, price_at_signal),
    };

    RiskEnvelope {
        target_price,
        stop_loss_price,
        position_size_shares: position_size_shares(user, price_at_signal),
    }
}

/// `positionSize = min(availableCapital · maxPositionSizePct, availableCapital)`,
/// quantised to whole shares by truncation.
pub fn position_size_shares(user: &UserPreferences, price: Decimal) -> i64 {
    if price <= Decimal::ZERO {
        return 0;
    }
    let capped = (user.available_capital * user.max_position_size_pct).min(user.available_capital);
    use rust_decimal::prelude::ToPrimitive;
    (capped / price).trunc().to_i64().unwrap_or(0)
}
