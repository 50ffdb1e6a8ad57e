// =============================================================================
// Regime Match — does the symbol behave like the market regime?
// =============================================================================
//
//   Trend      ADX > 25 and every shorter MA above the next longer one
//   Reversion  RSI < 40, or close in the lower 30 % of the Bollinger band
//   Breakout   relative volume above the surge ratio (default 1.5)
//
// Annotation only: the composite score is not rescaled by the match.

use crate::indicators::ema::ma_stack_aligned;
use crate::indicators::FeatureFrame;
use crate::types::RegimeLabel;

const TREND_MIN_ADX: f64 = 25.0;
const REVERSION_MAX_RSI: f64 = 40.0;
const REVERSION_MAX_PERCENT_B: f64 = 0.3;

pub fn regime_match(
    frame: &FeatureFrame,
    i: usize,
    regime: Option<RegimeLabel>,
    surge_ratio: f64,
) -> bool {
    match regime {
        Some(RegimeLabel::Trend) => {
            frame.value("adx", i).is_some_and(|adx| adx > TREND_MIN_ADX)
                && ma_stack_aligned(&frame.ma_stack(i)) == Some(true)
        }
        Some(RegimeLabel::Reversion) => {
            frame.value("rsi", i).is_some_and(|rsi| rsi < REVERSION_MAX_RSI)
                || frame
                    .value("bb_percent_b", i)
                    .is_some_and(|pb| pb <= REVERSION_MAX_PERCENT_B)
        }
        Some(RegimeLabel::Breakout) => frame
            .value("volume_ratio", i)
            .is_some_and(|r| r > surge_ratio),
        None => false,
    }
}
