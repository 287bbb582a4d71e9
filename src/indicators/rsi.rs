// =============================================================================
// Relative Strength Index (RSI) — Wilder's smoothing
// =============================================================================
//
// Average gain/loss is seeded over the first `n` price changes, then smoothed
// forward one bar at a time using Wilder's recurrence. All arithmetic is
// `Decimal`; `rsi_from_averages` covers the neutral/overbought/oversold edge
// cases (e.g. zero average loss).
// =============================================================================

use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Compute RSI(n) for `closes`. Requires `n + 1` bars; returns `None`
/// otherwise per the indicator engine's "unavailable, never imputed" rule.
pub fn rsi(closes: &[Decimal], n: usize) -> Option<Decimal> {
    if n == 0 || closes.len() < n + 1 {
        return None;
    }

    let changes: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let seed_gains: Decimal = changes[..n]
        .iter()
        .map(|&c| if c > Decimal::ZERO { c } else { Decimal::ZERO })
        .sum();
    let seed_losses: Decimal = changes[..n]
        .iter()
        .map(|&c| if c < Decimal::ZERO { -c } else { Decimal::ZERO })
        .sum();

    let mut avg_gain = seed_gains / Decimal::from(n);
    let mut avg_loss = seed_losses / Decimal::from(n);

    for &change in &changes[n..] {
        let gain = if change > Decimal::ZERO { change } else { Decimal::ZERO };
        let loss = if change < Decimal::ZERO { -change } else { Decimal::ZERO };
        avg_gain = (avg_gain * Decimal::from(n - 1) + gain) / Decimal::from(n);
        avg_loss = (avg_loss * Decimal::from(n - 1) + loss) / Decimal::from(n);
    }

    Some(rsi_from_averages(avg_gain, avg_loss))
}

/// Derives an RSI value from seeded/smoothed average gain and loss,
/// handling the degenerate all-flat and all-one-direction cases.
fn rsi_from_averages(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_gain == Decimal::ZERO && avg_loss == Decimal::ZERO {
        return Decimal::new(500, 1); // 50.0 — neutral, no movement at all
    }
    if avg_loss == Decimal::ZERO {
        return HUNDRED;
    }
    let rs = avg_gain / avg_loss;
    (HUNDRED - HUNDRED / (Decimal::ONE + rs)).round_dp(4)
}

pub fn is_oversold(value: Decimal) -> bool {
    value < Decimal::from(30)
}

pub fn is_overbought(value: Decimal) -> bool {
    value > Decimal::from(70)
}
