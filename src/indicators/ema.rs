// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive than the
// Simple Moving Average. Computed in `Decimal` and seeded with SMA(n) for the
// first value, per the usual EMA warm-up convention.
//
// Formula:
//   alpha = 2 / (n + 1)
//   EMA_t = close_t * alpha + EMA_{t-1} * (1 - alpha)
// =============================================================================

use rust_decimal::Decimal;

use super::sma::sma;

/// Compute the EMA series for `closes` and look-back `n`.
///
/// Returns an empty vec when the input is too short or `n` is zero. The
/// first element is the SMA(n) seed; subsequent elements smooth forward.
pub fn ema_series(closes: &[Decimal], n: usize) -> Vec<Decimal> {
    if n == 0 || closes.len() < n {
        return Vec::new();
    }

    let seed = match sma(&closes[..n], n) {
        Some(s) => s,
        None => return Vec::new(),
    };

    let alpha = Decimal::from(2) / Decimal::from(n + 1);
    let mut result = Vec::with_capacity(closes.len() - n + 1);
    result.push(seed);

    let mut prev = seed;
    for &close in &closes[n..] {
        let value = (close * alpha + prev * (Decimal::ONE - alpha)).round_dp(4);
        result.push(value);
        prev = value;
    }

    result
}

/// Current (most recent) EMA(n), or `None` on insufficient data.
pub fn ema(closes: &[Decimal], n: usize) -> Option<Decimal> {
    ema_series(closes, n).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ascending(n: usize) -> Vec<Decimal> {
        (1..=n).map(|i| Decimal::from(i)).collect()
    }

    #[test]
    fn ema_empty_input() {
        assert!(ema_series(&[], 5).is_empty());
    }

    #[test]
    fn ema_period_zero() {
        assert!(ema_series(&[dec!(1), dec!(2), dec!(3)], 0).is_empty());
    }

    #[test]
    fn ema_insufficient_data() {
        assert!(ema_series(&[dec!(1), dec!(2)], 5).is_empty());
    }

    #[test]
    fn ema_period_equals_length_seeds_with_sma() {
        let closes = vec![dec!(2), dec!(4), dec!(6)];
        let series = ema_series(&closes, 3);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0], dec!(4));
    }

    #[test]
    fn ema_known_values_match_manual_smoothing() {
        let closes = ascending(10);
        let series = ema_series(&closes, 5);
        assert_eq!(series.len(), 6);

        let alpha = Decimal::from(2) / Decimal::from(6);
        let mut expected = dec!(3); // SMA seed
        let mut expected_vec = vec![expected];
        for &c in &closes[5..] {
            expected = (c * alpha + expected * (Decimal::ONE - alpha)).round_dp(4);
            expected_vec.push(expected);
        }
        assert_eq!(series, expected_vec);
    }

    #[test]
    fn ema_returns_last_value() {
        let closes = ascending(10);
        assert_eq!(ema(&closes, 5), ema_series(&closes, 5).last().copied());
    }
}
