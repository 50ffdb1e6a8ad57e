// =============================================================================
// Signals Module
// =============================================================================
//
// Scoring and signal pipeline for one symbol:
// - Technical, pattern and volume sub-scores (each 0..100)
// - Regime-adaptive composite score and regime-match annotation
// - Confirmation / cooldown state machine producing BUY / HOLD / SELL

pub mod aggregator;
pub mod generator;
pub mod pattern_score;
pub mod regime_match;
pub mod sub_scores;
pub mod volume_score;

pub use aggregator::{CompositeScore, ScoreAggregator, ScoreContribution};
pub use generator::{SignalGenerator, SignalState, SignalStep};
pub use pattern_score::{PatternEvidence, PatternHit};
pub use sub_scores::IndicatorScores;
