// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Market regime classification for the index and the machinery that turns a
// noisy per-date label into a stable one:
// - detector:   instantaneous TREND / BREAKOUT / REVERSION classification
// - history:    persisted date -> label store
// - hysteresis: confirmation + cooldown debounce over the history
// - tracker:    drives both across an index timeline
// - weights:    regime-specific sub-score weighting

pub mod detector;
pub mod history;
pub mod hysteresis;
pub mod tracker;
pub mod weights;

pub use detector::{classify, RegimeAssessment, RegimeClassifier, RegimeSnapshot};
pub use history::{
    InMemoryHistoryStore, JsonFileHistoryStore, RegimeHistory, RegimeHistoryEntry,
    RegimeHistoryStore,
};
pub use hysteresis::{step, HysteresisDecision, HysteresisOutcome, HysteresisState, RegimeHysteresis};
pub use tracker::{RegimeDecision, RegimeRun, RegimeTimeline, RegimeTracker};
pub use weights::{adapt_weights, WeightVector};
