// =============================================================================
// Regime Signal Engine
// =============================================================================
//
// Classifies the market regime from an index, stabilises it against flicker,
// fuses per-symbol technical / pattern / volume sub-scores with
// regime-adapted weights, and turns the composite score into confirmed
// BUY / HOLD / SELL signals.

pub mod error;
pub mod indicators;
pub mod market_data;
pub mod output;
pub mod persistence;
pub mod pipeline;
pub mod regime;
pub mod runtime_config;
pub mod signals;
pub mod types;

pub use error::{AssessmentKind, CoreError};
pub use market_data::{BarSeries, PriceBar};
pub use pipeline::{SignalRecord, SymbolPipeline};
pub use regime::{RegimeClassifier, RegimeHysteresis, RegimeTimeline, RegimeTracker};
pub use runtime_config::RuntimeConfig;
pub use types::{RegimeLabel, Signal};
