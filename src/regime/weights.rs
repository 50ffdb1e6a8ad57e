// =============================================================================
// Regime Weight Adapter
// =============================================================================
//
// Multiplies the base {pattern, technical, volume} weights by a per-regime
// factor and renormalises so the result sums to one:
//
//   regime      pattern  technical  volume
//   Trend         0.8       1.2       1.0
//   Reversion     1.3       0.9       0.8
//   Breakout      1.0       1.1       1.4
//   (none)        1.0       1.0       1.0

use serde::{Deserialize, Serialize};

use crate::types::RegimeLabel;

fn default_pattern_weight() -> f64 {
    0.3
}

fn default_technical_weight() -> f64 {
    0.5
}

fn default_volume_weight() -> f64 {
    0.2
}

/// Weights over the three sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    #[serde(default = "default_pattern_weight")]
    pub pattern: f64,
    #[serde(default = "default_technical_weight")]
    pub technical: f64,
    #[serde(default = "default_volume_weight")]
    pub volume: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            pattern: default_pattern_weight(),
            technical: default_technical_weight(),
            volume: default_volume_weight(),
        }
    }
}

impl WeightVector {
    pub fn new(pattern: f64, technical: f64, volume: f64) -> Self {
        Self {
            pattern,
            technical,
            volume,
        }
    }

    pub fn sum(&self) -> f64 {
        self.pattern + self.technical + self.volume
    }

    /// Scale to a unit sum.  Negative or non-finite components count as zero;
    /// an all-zero vector becomes equal thirds.
    pub fn normalized(&self) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let (p, t, v) = (clean(self.pattern), clean(self.technical), clean(self.volume));
        let total = p + t + v;
        if total <= 0.0 {
            let third = 1.0 / 3.0;
            return Self::new(third, third, third);
        }
        Self::new(p / total, t / total, v / total)
    }

    /// Weighted fusion of the three sub-scores.
    pub fn combine(&self, pattern: f64, technical: f64, volume: f64) -> f64 {
        self.pattern * pattern + self.technical * technical + self.volume * volume
    }
}

/// Multiplicative adjustment for a regime, as `(pattern, technical, volume)`.
pub fn regime_factors(regime: Option<RegimeLabel>) -> (f64, f64, f64) {
    match regime {
        Some(RegimeLabel::Trend) => (0.8, 1.2, 1.0),
        Some(RegimeLabel::Reversion) => (1.3, 0.9, 0.8),
        Some(RegimeLabel::Breakout) => (1.0, 1.1, 1.4),
        None => (1.0, 1.0, 1.0),
    }
}

/// Adapt `base` to `regime` and renormalise.
pub fn adapt_weights(base: &WeightVector, regime: Option<RegimeLabel>) -> WeightVector {
    let (fp, ft, fv) = regime_factors(regime);
    WeightVector::new(base.pattern * fp, base.technical * ft, base.volume * fv).normalized()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit(w: &WeightVector) {
        assert!(w.pattern >= 0.0 && w.technical >= 0.0 && w.volume >= 0.0);
        assert!((w.sum() - 1.0).abs() < 1e-12, "sum = {}", w.sum());
    }

    #[test]
    fn every_regime_yields_unit_weights() {
        let base = WeightVector::default();
        for regime in RegimeLabel::ALL {
            assert_unit(&adapt_weights(&base, Some(regime)));
        }
        assert_unit(&adapt_weights(&base, None));
    }

    #[test]
    fn trend_shifts_weight_to_technical() {
        let w = adapt_weights(&WeightVector::default(), Some(RegimeLabel::Trend));
        // 0.24 / 0.60 / 0.20 over a total of 1.04
        assert!((w.pattern - 0.24 / 1.04).abs() < 1e-12);
        assert!((w.technical - 0.60 / 1.04).abs() < 1e-12);
        assert!((w.volume - 0.20 / 1.04).abs() < 1e-12);
    }

    #[test]
    fn breakout_boosts_volume() {
        let base = WeightVector::default();
        let w = adapt_weights(&base, Some(RegimeLabel::Breakout));
        assert!(w.volume > base.volume);
    }

    #[test]
    fn no_regime_is_identity_for_unit_base() {
        let base = WeightVector::default();
        let w = adapt_weights(&base, None);
        assert!((w.pattern - 0.3).abs() < 1e-12);
        assert!((w.technical - 0.5).abs() < 1e-12);
        assert!((w.volume - 0.2).abs() < 1e-12);
    }

    #[test]
    fn degenerate_bases_still_normalise() {
        assert_unit(&WeightVector::new(0.0, 0.0, 0.0).normalized());
        assert_unit(&WeightVector::new(-1.0, 2.0, f64::NAN).normalized());
        let w = WeightVector::new(-1.0, 2.0, f64::NAN).normalized();
        assert!((w.technical - 1.0).abs() < 1e-12);
    }
}
