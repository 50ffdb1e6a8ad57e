// =============================================================================
// Score Aggregator — regime-adaptive composite of the three sub-scores
// =============================================================================
//
//   composite = w_pattern * pattern + w_technical * indicator + w_volume * volume
//
// with weights adapted to the stabilised regime on the date (base weights,
// renormalised, when there is none).  Regime match and explanatory tags ride
// along for the output table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::stats::clamp_score;
use crate::indicators::FeatureFrame;
use crate::regime::tracker::RegimeTimeline;
use crate::regime::weights::{adapt_weights, WeightVector};
use crate::runtime_config::{IndicatorParams, PatternParams, RuntimeConfig, VolumeParams};
use crate::signals::pattern_score::{pattern_score, PatternEvidence};
use crate::signals::regime_match::regime_match;
use crate::signals::sub_scores::{indicator_scores, indicator_tags, IndicatorScores};
use crate::signals::volume_score::volume_score;
use crate::types::RegimeLabel;

/// The contribution of one sub-score to the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub name: String,
    pub weight: f64,
    pub score: f64,
    pub contribution: f64,
}

/// Composite score for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub date: NaiveDate,
    pub regime: Option<RegimeLabel>,
    pub indicator_score: f64,
    pub pattern_score: f64,
    pub volume_score: f64,
    pub composite: f64,
    pub weights: WeightVector,
    pub contributions: Vec<ScoreContribution>,
    pub families: IndicatorScores,
    pub regime_match: bool,
    pub tags: Vec<String>,
}

/// Combines sub-scores into one composite score per date.
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    base_weights: WeightVector,
    indicators: IndicatorParams,
    patterns: PatternParams,
    volume: VolumeParams,
}

impl ScoreAggregator {
    pub fn new(
        base_weights: WeightVector,
        indicators: IndicatorParams,
        patterns: PatternParams,
        volume: VolumeParams,
    ) -> Self {
        Self {
            base_weights,
            indicators,
            patterns,
            volume,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            config.base_weights,
            config.indicators.clone(),
            config.patterns.clone(),
            config.volume.clone(),
        )
    }

    pub fn indicator_params(&self) -> &IndicatorParams {
        &self.indicators
    }

    /// Score slot `i` of `frame` under `regime`.
    pub fn score_at(
        &self,
        frame: &FeatureFrame,
        i: usize,
        regime: Option<RegimeLabel>,
        patterns: &PatternEvidence,
    ) -> CompositeScore {
        let date = frame.dates[i];

        let families = indicator_scores(frame, i, &self.indicators, regime);
        let indicator = families.mean();
        let pattern = pattern_score(patterns.hits_on(date), &self.patterns.selected);
        let volume = volume_score(frame, i, &self.volume, self.indicators.volume_window);

        let weights = adapt_weights(&self.base_weights, regime);
        let contributions: Vec<ScoreContribution> = [
            ("pattern", weights.pattern, pattern.score),
            ("technical", weights.technical, indicator),
            ("volume", weights.volume, volume.score),
        ]
        .into_iter()
        .map(|(name, weight, score)| ScoreContribution {
            name: name.to_string(),
            weight,
            score,
            contribution: weight * score,
        })
        .collect();
        let composite = clamp_score(weights.combine(pattern.score, indicator, volume.score));

        let matched = regime_match(frame, i, regime, self.volume.surge_ratio);

        let mut tags = indicator_tags(frame, i, &self.indicators);
        tags.extend(volume.tags);
        tags.extend(pattern.matched.iter().map(|p| format!("pattern:{p}")));
        if let Some(r) = regime {
            tags.push(format!("regime:{r}"));
        }
        if matched {
            tags.push("regime_match".to_string());
        }

        CompositeScore {
            date,
            regime,
            indicator_score: indicator,
            pattern_score: pattern.score,
            volume_score: volume.score,
            composite,
            weights,
            contributions,
            families,
            regime_match: matched,
            tags,
        }
    }

    /// Score every date of `frame`, looking the regime up in `timeline`.
    pub fn score_series(
        &self,
        frame: &FeatureFrame,
        timeline: &RegimeTimeline,
        patterns: &PatternEvidence,
    ) -> Vec<CompositeScore> {
        (0..frame.len())
            .map(|i| self.score_at(frame, i, timeline.as_of(frame.dates[i]), patterns))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::PriceBar;
    use crate::signals::pattern_score::PatternHit;

    fn bars(points: impl IntoIterator<Item = (f64, f64)>) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        points
            .into_iter()
            .enumerate()
            .map(|(i, (c, v))| PriceBar::new(start + chrono::Duration::days(i as i64), c).with_volume(v))
            .collect()
    }

    #[test]
    fn composite_is_weighted_sum() {
        let b = bars((0..100).map(|i| (100.0 + (i as f64 * 0.3).sin() * 5.0, 1_000.0 + i as f64)));
        let agg = ScoreAggregator::default();
        let frame = FeatureFrame::compute(&b, agg.indicator_params());
        let s = agg.score_at(&frame, 99, Some(RegimeLabel::Breakout), &PatternEvidence::default());

        let w = adapt_weights(&WeightVector::default(), Some(RegimeLabel::Breakout));
        let expected = w.pattern * s.pattern_score + w.technical * s.indicator_score + w.volume * s.volume_score;
        assert!((s.composite - expected).abs() < 1e-9);
        let summed: f64 = s.contributions.iter().map(|c| c.contribution).sum();
        assert!((summed - s.composite).abs() < 1e-9);
        assert!(s.tags.contains(&"regime:breakout".to_string()));
    }

    #[test]
    fn no_regime_uses_base_weights() {
        let b = bars((0..80).map(|i| (100.0 + i as f64, 1_000.0)));
        let agg = ScoreAggregator::default();
        let frame = FeatureFrame::compute(&b, agg.indicator_params());
        let s = agg.score_at(&frame, 79, None, &PatternEvidence::default());
        assert_eq!(s.weights, WeightVector::default().normalized());
        assert!(!s.regime_match);
        assert!(!s.tags.iter().any(|t| t.starts_with("regime")));
    }

    #[test]
    fn all_neutral_inputs_give_fifty() {
        let b = bars((0..30).map(|_| (10.0, 0.0)));
        let config = RuntimeConfig {
            indicators: IndicatorParams::all_disabled(),
            ..RuntimeConfig::default()
        };
        let agg = ScoreAggregator::from_config(&config);
        let frame = FeatureFrame::compute(&b, agg.indicator_params());
        for i in 0..frame.len() {
            for regime in [None, Some(RegimeLabel::Trend), Some(RegimeLabel::Reversion)] {
                let s = agg.score_at(&frame, i, regime, &PatternEvidence::default());
                assert_eq!(s.indicator_score, 50.0);
                assert!((s.composite - 50.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn bullish_pattern_lifts_composite() {
        let b = bars((0..40).map(|_| (10.0, 1_000.0)));
        let agg = ScoreAggregator::default();
        let frame = FeatureFrame::compute(&b, agg.indicator_params());
        let date = frame.dates[39];
        let evidence = PatternEvidence::from_hits([PatternHit::new(date, "hammer", 1, 1.0)]);

        let plain = agg.score_at(&frame, 39, None, &PatternEvidence::default());
        let lifted = agg.score_at(&frame, 39, None, &evidence);
        assert_eq!(lifted.pattern_score, 75.0);
        assert!(lifted.composite > plain.composite);
        assert!(lifted.tags.contains(&"pattern:hammer".to_string()));
    }

    #[test]
    fn series_scores_stay_in_range_on_degenerate_input() {
        let flat_zero = bars((0..90).map(|_| (5.0, 0.0)));
        let spiky = bars((0..90).map(|i| (if i % 2 == 0 { 1.0 } else { 1_000.0 }, (i % 3) as f64 * 1e9)));
        let agg = ScoreAggregator::default();
        let timeline: RegimeTimeline = flat_zero
            .iter()
            .enumerate()
            .map(|(i, b)| (b.date, RegimeLabel::ALL[i % 3]))
            .collect();
        for b in [flat_zero, spiky] {
            let frame = FeatureFrame::compute(&b, agg.indicator_params());
            for s in agg.score_series(&frame, &timeline, &PatternEvidence::default()) {
                for v in [s.composite, s.indicator_score, s.pattern_score, s.volume_score] {
                    assert!((0.0..=100.0).contains(&v), "{} -> {v}", s.date);
                }
            }
        }
    }
}
