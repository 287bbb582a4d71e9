// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================

use rust_decimal::Decimal;

/// Arithmetic mean of the last `n` closes. Requires exactly `n` bars
/// available at minimum; returns `None` on insufficient data.
pub fn sma(closes: &[Decimal], n: usize) -> Option<Decimal> {
    if n == 0 || closes.len() < n {
        return None;
    }
    let window = &closes[closes.len() - n..];
    let sum: Decimal = window.iter().sum();
    Some((sum / Decimal::from(n)).round_dp(4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sma_basic() {
        let closes = vec![dec!(10), dec!(20), dec!(30)];
        assert_eq!(sma(&closes, 3), Some(dec!(20)));
    }

    #[test]
    fn sma_insufficient_data() {
        let closes = vec![dec!(10), dec!(20)];
        assert_eq!(sma(&closes, 3), None);
    }

    #[test]
    fn sma_zero_period() {
        let closes = vec![dec!(10)];
        assert_eq!(sma(&closes, 0), None);
    }

    #[test]
    fn sma_uses_trailing_window() {
        let closes = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        assert_eq!(sma(&closes, 3), Some(dec!(4)));
    }
}
