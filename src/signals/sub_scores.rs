// =============================================================================
// Technical Sub-Scores — indicator families mapped to 0..100
// =============================================================================
//
// Each family maps its indicator values on one date to a bullishness score in
// [0, 100] where 50 is neutral.  RSI and Bollinger position read differently
// per regime:
//
//   RSI        Trend      >= 50 rewarded as momentum continuation
//              Reversion  <= 30 rewarded highest as a reversal setup
//              Breakout   flat 50 inside 40..60, penalised outside
//              (none)     classic oversold / overbought
//
//   Bollinger  Trend      riding the upper half rewarded
//              Reversion  near the lower band rewarded
//              Breakout   close above the upper band rewarded
//
// A family that is disabled, or whose indicator is still warming up on the
// date, is skipped.  The indicator score is the mean of what remains, or 50
// when nothing remains.

use serde::{Deserialize, Serialize};

use crate::indicators::bollinger::BollingerPoint;
use crate::indicators::ema::{ma_stack_aligned, ma_stack_fraction};
use crate::indicators::macd::MacdPoint;
use crate::indicators::stats::{clamp_score, remap};
use crate::indicators::stochastic::StochasticPoint;
use crate::indicators::FeatureFrame;
use crate::runtime_config::IndicatorParams;
use crate::types::RegimeLabel;

const NEUTRAL: f64 = 50.0;

// =============================================================================
// Per-family scoring functions
// =============================================================================

pub fn rsi_score(rsi: f64, regime: Option<RegimeLabel>) -> f64 {
    let score = match regime {
        Some(RegimeLabel::Trend) => {
            if rsi < 30.0 {
                30.0
            } else if rsi < 50.0 {
                remap(rsi, 30.0, 50.0, 30.0, 55.0)
            } else if rsi < 70.0 {
                remap(rsi, 50.0, 70.0, 60.0, 85.0)
            } else {
                remap(rsi, 70.0, 90.0, 85.0, 65.0)
            }
        }
        Some(RegimeLabel::Reversion) => remap(rsi, 30.0, 70.0, 90.0, 15.0),
        Some(RegimeLabel::Breakout) => {
            if (40.0..=60.0).contains(&rsi) {
                NEUTRAL
            } else if rsi < 40.0 {
                remap(rsi, 20.0, 40.0, 20.0, 50.0)
            } else {
                remap(rsi, 60.0, 80.0, 50.0, 20.0)
            }
        }
        None => remap(rsi, 30.0, 70.0, 70.0, 30.0),
    };
    clamp_score(score)
}

/// Histogram as % of price through a tanh, plus a bonus on a signal-line
/// cross.
pub fn macd_score(current: MacdPoint, previous: Option<MacdPoint>, close: f64) -> f64 {
    let hist_pct = if close.abs() > f64::EPSILON {
        current.histogram / close.abs() * 100.0
    } else {
        0.0
    };
    let mut score = NEUTRAL + 25.0 * (hist_pct / 0.5).tanh();
    if let Some(prev) = previous {
        if prev.line <= prev.signal && current.line > current.signal {
            score += 15.0;
        } else if prev.line >= prev.signal && current.line < current.signal {
            score -= 15.0;
        }
    }
    clamp_score(score)
}

pub fn stochastic_score(current: StochasticPoint, previous: Option<StochasticPoint>) -> f64 {
    if let Some(prev) = previous {
        let crossed_up = prev.k <= prev.d && current.k > current.d;
        let crossed_down = prev.k >= prev.d && current.k < current.d;
        if crossed_up && current.d <= 20.0 {
            return 80.0;
        }
        if crossed_down && current.d >= 80.0 {
            return 20.0;
        }
    }
    clamp_score(NEUTRAL + ((current.k - current.d) * 1.5).clamp(-20.0, 20.0))
}

/// Direction from ±DI, magnitude from ADX (saturating at 50).
pub fn adx_score(adx: f64, plus_di: f64, minus_di: f64) -> f64 {
    let total = plus_di + minus_di;
    if total <= 0.0 || !total.is_finite() {
        return NEUTRAL;
    }
    let strength = (adx / 50.0).clamp(0.0, 1.0);
    clamp_score(NEUTRAL + 40.0 * strength * (plus_di - minus_di) / total)
}

/// Share of adjacent moving-average pairs stacked bullishly.
pub fn ma_alignment_score(stack: &[Option<f64>]) -> Option<f64> {
    ma_stack_fraction(stack).map(|f| clamp_score(f * 100.0))
}

pub fn bollinger_score(band: BollingerPoint, regime: Option<RegimeLabel>) -> f64 {
    let pb = band.percent_b;
    let score = match regime {
        Some(RegimeLabel::Reversion) => 100.0 * (1.0 - pb),
        Some(RegimeLabel::Trend) => {
            if pb >= 1.0 {
                75.0
            } else if pb >= 0.5 {
                remap(pb, 0.5, 1.0, 55.0, 80.0)
            } else {
                remap(pb, 0.0, 0.5, 25.0, 50.0)
            }
        }
        Some(RegimeLabel::Breakout) => {
            if pb > 1.0 {
                85.0
            } else if pb < 0.0 {
                15.0
            } else {
                NEUTRAL
            }
        }
        None => NEUTRAL + (0.5 - pb) * 40.0,
    };
    clamp_score(score)
}

// =============================================================================
// Per-date bundle
// =============================================================================

/// Family scores on one date; `None` means skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScores {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub stochastic: Option<f64>,
    pub adx: Option<f64>,
    pub ma_alignment: Option<f64>,
    pub bollinger: Option<f64>,
}

impl IndicatorScores {
    pub fn available(&self) -> usize {
        self.values().count()
    }

    /// Mean of the available family scores, 50 when there are none.
    pub fn mean(&self) -> f64 {
        let n = self.available();
        if n == 0 {
            return NEUTRAL;
        }
        clamp_score(self.values().sum::<f64>() / n as f64)
    }

    fn values(&self) -> impl Iterator<Item = f64> {
        [
            self.rsi,
            self.macd,
            self.stochastic,
            self.adx,
            self.ma_alignment,
            self.bollinger,
        ]
        .into_iter()
        .flatten()
    }
}

/// Score every enabled family at slot `i` of `frame`.
pub fn indicator_scores(
    frame: &FeatureFrame,
    i: usize,
    params: &IndicatorParams,
    regime: Option<RegimeLabel>,
) -> IndicatorScores {
    let prev = i.checked_sub(1);
    let macd_at = |j: usize| frame.macd.get(j).copied().flatten();
    let stoch_at = |j: usize| frame.stochastic.get(j).copied().flatten();

    IndicatorScores {
        rsi: params
            .enable_rsi
            .then(|| frame.value("rsi", i))
            .flatten()
            .map(|rsi| rsi_score(rsi, regime)),
        macd: params
            .enable_macd
            .then(|| macd_at(i))
            .flatten()
            .map(|m| macd_score(m, prev.and_then(macd_at), frame.close[i])),
        stochastic: params
            .enable_stochastic
            .then(|| stoch_at(i))
            .flatten()
            .map(|s| stochastic_score(s, prev.and_then(stoch_at))),
        adx: if params.enable_adx {
            match (
                frame.value("adx", i),
                frame.value("plus_di", i),
                frame.value("minus_di", i),
            ) {
                (Some(adx), Some(p), Some(m)) => Some(adx_score(adx, p, m)),
                _ => None,
            }
        } else {
            None
        },
        ma_alignment: params
            .enable_ma_alignment
            .then(|| ma_alignment_score(&frame.ma_stack(i)))
            .flatten(),
        bollinger: params
            .enable_bollinger
            .then(|| frame.bollinger.get(i).copied().flatten())
            .flatten()
            .map(|b| bollinger_score(b, regime)),
    }
}

/// Explanatory tags for the technical families on slot `i`.
pub fn indicator_tags(frame: &FeatureFrame, i: usize, params: &IndicatorParams) -> Vec<String> {
    let mut tags = Vec::new();

    if params.enable_rsi {
        match frame.value("rsi", i) {
            Some(rsi) if rsi < 30.0 => tags.push("rsi_oversold".to_string()),
            Some(rsi) if rsi > 70.0 => tags.push("rsi_overbought".to_string()),
            _ => {}
        }
    }
    if params.enable_macd {
        let cur = frame.macd.get(i).copied().flatten();
        let prev = i.checked_sub(1).and_then(|j| frame.macd.get(j).copied().flatten());
        if let Some(cur) = cur {
            if prev.is_some_and(|p| p.line <= p.signal) && cur.line > cur.signal {
                tags.push("macd_cross_up".to_string());
            } else if cur.histogram > 0.0 {
                tags.push("macd_bullish".to_string());
            }
        }
    }
    if params.enable_adx {
        if let (Some(adx), Some(p), Some(m)) = (
            frame.value("adx", i),
            frame.value("plus_di", i),
            frame.value("minus_di", i),
        ) {
            if adx > 25.0 && p > m {
                tags.push("adx_strong_up".to_string());
            }
        }
    }
    if params.enable_ma_alignment && ma_stack_aligned(&frame.ma_stack(i)) == Some(true) {
        tags.push("ma_aligned".to_string());
    }
    if params.enable_bollinger {
        match frame.value("bb_percent_b", i) {
            Some(pb) if pb <= 0.0 => tags.push("bb_lower_touch".to_string()),
            Some(pb) if pb >= 1.0 => tags.push("bb_upper_break".to_string()),
            _ => {}
        }
    }
    tags
}
