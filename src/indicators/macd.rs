// =============================================================================
// MACD(12, 26, 9)
// =============================================================================

use rust_decimal::Decimal;

use super::ema::ema_series;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdResult {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

/// Computes MACD(fast, slow, signal) on `closes`. Returns `None` if there is
/// not enough history for the slow EMA plus the signal smoothing window.
pub fn macd(closes: &[Decimal], fast: usize, slow: usize, signal_period: usize) -> Option<MacdResult> {
    if closes.len() < slow + signal_period {
        return None;
    }

    let fast_series = ema_series(closes, fast);
    let slow_series = ema_series(closes, slow);

    // Align the two series on their shared tail (fast starts earlier).
    let offset = fast_series.len().checked_sub(slow_series.len())?;
    let macd_series: Vec<Decimal> = slow_series
        .iter()
        .enumerate()
        .map(|(i, &slow_v)| fast_series[i + offset] - slow_v)
        .collect();

    if macd_series.len() < signal_period {
        return None;
    }

    let signal_series = ema_series(&macd_series, signal_period);
    let macd_last = *macd_series.last()?;
    let signal_last = *signal_series.last()?;

    Some(MacdResult {
        macd: macd_last,
        signal: signal_last,
        histogram: (macd_last - signal_last).round_dp(4),
    })
}

/// Returns `true` when the MACD histogram has just crossed above zero
/// between the previous and current bar's histogram value.
pub fn histogram_crossed_above_zero(prev: Decimal, current: Decimal) -> bool {
    prev <= Decimal::ZERO && current > Decimal::ZERO
}

pub fn histogram_crossed_below_zero(prev: Decimal, current: Decimal) -> bool {
    prev >= Decimal::ZERO && current < Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<Decimal> {
        (1..=n).map(Decimal::from).collect()
    }

    #[test]
    fn macd_insufficient_data_returns_none() {
        assert!(macd(&ascending(10), 12, 26, 9).is_none());
    }

    #[test]
    fn macd_ascending_series_is_positive() {
        let closes = ascending(60);
        let result = macd(&closes, 12, 26, 9).expect("enough data");
        assert!(result.macd > Decimal::ZERO);
    }

    #[test]
    fn histogram_cross_detection() {
        assert!(histogram_crossed_above_zero(Decimal::from(-1), Decimal::from(1)));
        assert!(!histogram_crossed_above_zero(Decimal::from(1), Decimal::from(2)));
        assert!(histogram_crossed_below_zero(Decimal::from(1), Decimal::from(-1)));
    }
}
