// =============================================================================
// Volume Score — configured volume conditions mapped to 0..100
// =============================================================================
//
//   volume_ratio  participation: relative volume vs its rolling average
//   price_volume  up / down day confirmed by above-average volume
//   obv_trend     OBV slope over the volume window, per unit of average volume
//
// A condition is skipped when volume is missing or zero on the date.  The
// score is the mean of the conditions that could be evaluated, or 50.

use crate::indicators::stats::{clamp_score, linear_regression_slope, remap};
use crate::indicators::FeatureFrame;
use crate::runtime_config::{VolumeCondition, VolumeParams};

const NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeScore {
    pub score: f64,
    /// Conditions that could be evaluated.
    pub evaluated: usize,
    pub tags: Vec<String>,
}

/// Relative volume: quiet days lean bearish, surges lean bullish.
pub fn volume_ratio_score(ratio: f64, surge_ratio: f64) -> f64 {
    let surge = if surge_ratio > 1.0 { surge_ratio } else { 1.5 };
    let score = if ratio >= 1.0 {
        remap(ratio, 1.0, surge, 50.0, 75.0)
    } else {
        remap(ratio, 0.5, 1.0, 40.0, 50.0)
    };
    clamp_score(score)
}

/// Price move weighted by how far volume exceeds its average.  Moves on
/// below-average volume are unconfirmed.
pub fn price_volume_score(change: f64, ratio: f64) -> f64 {
    if ratio <= 1.0 || change == 0.0 || !change.is_finite() {
        return NEUTRAL;
    }
    let conviction = (ratio - 1.0).min(1.0) * 35.0;
    clamp_score(NEUTRAL + change.signum() * conviction)
}

/// OBV slope normalised by average volume, through a tanh.
pub fn obv_trend_score(normalised_slope: f64) -> f64 {
    clamp_score(NEUTRAL + 40.0 * (2.0 * normalised_slope).tanh())
}

/// OBV regression slope over the trailing `window` slots ending at `i`,
/// divided by the average volume on `i`.
fn normalised_obv_slope(frame: &FeatureFrame, i: usize, window: usize) -> Option<f64> {
    if window < 2 || i + 1 < window {
        return None;
    }
    let obv: Option<Vec<f64>> = frame.obv[i + 1 - window..=i].iter().copied().collect();
    let slope = linear_regression_slope(&obv?)?;
    let avg = frame.volume_ma.get(i).copied().flatten().filter(|a| *a > 0.0)?;
    let s = slope / avg;
    s.is_finite().then_some(s)
}

/// Evaluate the configured conditions on slot `i`.
pub fn volume_score(frame: &FeatureFrame, i: usize, params: &VolumeParams, window: usize) -> VolumeScore {
    let ratio = frame.value("volume_ratio", i);
    let mut scores = Vec::with_capacity(params.conditions.len());
    let mut tags = Vec::new();

    if let Some(r) = ratio {
        if r >= params.surge_ratio {
            tags.push("volume_surge".to_string());
        }
    }

    for condition in &params.conditions {
        let score = match condition {
            VolumeCondition::VolumeRatio => ratio.map(|r| volume_ratio_score(r, params.surge_ratio)),
            VolumeCondition::PriceVolume => {
                let change = i.checked_sub(1).map(|p| frame.close[i] - frame.close[p]);
                match (change, ratio) {
                    (Some(change), Some(r)) => Some(price_volume_score(change, r)),
                    _ => None,
                }
            }
            VolumeCondition::ObvTrend => normalised_obv_slope(frame, i, window).map(|s| {
                if s > 0.25 {
                    tags.push("obv_rising".to_string());
                } else if s < -0.25 {
                    tags.push("obv_falling".to_string());
                }
                obv_trend_score(s)
            }),
        };
        if let Some(s) = score {
            scores.push(s);
        }
    }

    let score = if scores.is_empty() {
        NEUTRAL
    } else {
        clamp_score(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    VolumeScore {
        score,
        evaluated: scores.len(),
        tags,
    }
}
