// =============================================================================
// Bollinger Bands (20, 2.0)
// =============================================================================
//
// middle = SMA(n); upper/lower = middle +/- k * population-stdev(n), computed
// in `Decimal` throughout so no floating-point error creeps into the bands.
// =============================================================================

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use super::sma::sma;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BollingerResult {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

/// Computes Bollinger Bands over the trailing `n` closes with `k` standard
/// deviations. Returns `None` on insufficient data or a degenerate middle.
pub fn bollinger(closes: &[Decimal], n: usize, k: f64) -> Option<BollingerResult> {
    if n == 0 || closes.len() < n {
        return None;
    }

    let window = &closes[closes.len() - n..];
    let middle = sma(window, n)?;
    if middle == Decimal::ZERO {
        return None;
    }

    let variance: Decimal = window
        .iter()
        .map(|&x| (x - middle) * (x - middle))
        .sum::<Decimal>()
        / Decimal::from(n);

    let std_dev = variance.sqrt()?;
    let k_dec = Decimal::from_f64(k)?;

    let upper = (middle + k_dec * std_dev).round_dp(4);
    let lower = (middle - k_dec * std_dev).round_dp(4);

    Some(BollingerResult {
        upper,
        middle: middle.round_dp(4),
        lower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bollinger_basic_ordering() {
        let closes: Vec<Decimal> = (1..=20).map(Decimal::from).collect();
        let bb = bollinger(&closes, 20, 2.0).expect("enough data");
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let closes = vec![dec!(1), dec!(2), dec!(3)];
        assert!(bollinger(&closes, 20, 2.0).is_none());
    }

    #[test]
    fn bollinger_flat_series_has_zero_width() {
        let closes = vec![dec!(100); 20];
        let bb = bollinger(&closes, 20, 2.0).expect("enough data");
        assert_eq!(bb.upper, bb.middle);
        assert_eq!(bb.lower, bb.middle);
    }
}
