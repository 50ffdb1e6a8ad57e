// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the technical indicators used by
// the regime classifier and the sub-score calculators.  Series functions return
// one `Option` slot per input bar: `None` marks warm-up or a numerical edge
// case, so callers skip a date rather than score it as zero.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod features;
pub mod macd;
pub mod rsi;
pub mod stats;
pub mod stochastic;
pub mod volume;

pub use features::FeatureFrame;
