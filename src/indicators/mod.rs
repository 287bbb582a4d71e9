// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators named by the
// indicator engine. Every public function returns `Option<T>` (or a
// dedicated "unavailable" variant) so callers are forced to handle
// insufficient-data scenarios rather than receiving an imputed value.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
