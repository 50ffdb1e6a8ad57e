// =============================================================================
// Market Regime Classifier
// =============================================================================
//
// Classifies the market index into one of three regimes from a technical
// snapshot taken on a single evaluation date.
//
// Detection hierarchy (evaluated top-to-bottom; first match wins):
//
//   1. TREND     — structure >= 0.67 AND confidence >= 0.70
//                  structure  = share of {close > MA60, MA20 slope > 0.1 %,
//                               +DI > -DI}
//                  strength   = mean(ADX contribution, ATR trend distance)
//                  confidence = 0.65 * structure + 0.35 * strength
//   2. BREAKOUT  — squeeze score >= 0.5
//                  +0.4 bandwidth in lowest 20th percentile of last 20 bars
//                  +0.3 close within 3 % of MA20
//                  +0.2 ADX < 25
//                  +0.1 volume > 1.2x its 20-bar average
//   3. REVERSION — reversion score >= 0.5, otherwise still REVERSION with a
//                  fixed 0.5 confidence
//                  +0.3 close between MA20 and MA60
//                  +0.3 ADX < 20
//                  +0.2 RSI < 30 or RSI > 70
//                  +0.2 |close - MA20| > 1.5 sigma of last 20 closes
//
// With fewer than `min_bars` bars, or when a feature cannot be computed, the
// result degrades to TREND with confidence 0.5 and an `error` evidence entry.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{AssessmentKind, CoreError};
use crate::indicators::adx::directional_series;
use crate::indicators::atr::atr_series;
use crate::indicators::bollinger::bollinger_series;
use crate::indicators::ema::sma_series;
use crate::indicators::rsi::rsi_series;
use crate::indicators::stats::{linear_regression_slope, percentile, remap, std_dev};
use crate::indicators::volume::volume_sma_series;
use crate::market_data::PriceBar;
use crate::runtime_config::RegimeParams;
use crate::types::RegimeLabel;

const SHORT_MA: usize = 20;
const LONG_MA: usize = 60;
const SLOPE_BARS: usize = 7;
const SLOPE_THRESHOLD_PCT: f64 = 0.1;
const BAND_WINDOW: usize = 20;
const BAND_STD: f64 = 2.0;
const SQUEEZE_PERCENTILE: f64 = 20.0;

const TREND_MIN_STRUCTURE: f64 = 0.67;
const TREND_MIN_CONFIDENCE: f64 = 0.70;
const BRANCH_MIN_SCORE: f64 = 0.5;
const DEGRADED_CONFIDENCE: f64 = 0.5;

// =============================================================================
// Types
// =============================================================================

/// Technical features of the index on one evaluation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub close: f64,
    pub ma20: f64,
    pub ma60: f64,
    /// OLS slope of the last 7 MA20 values, as % of their mean per bar.
    pub ma20_slope_pct: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: f64,
    pub atr: f64,
    pub rsi: f64,
    /// Standard deviation of the last 20 closes.
    pub close_std20: f64,
    /// Current Bollinger band width.
    pub bandwidth: f64,
    /// 20th percentile of band width over the last 20 bars.
    pub bandwidth_p20: f64,
    pub volume: Option<f64>,
    pub volume_avg20: Option<f64>,
}

/// Outcome of classifying one date.
///
/// Always well-formed: when `kind` is not `Ok` the label is the safe default
/// (TREND, confidence 0.5) and `detail` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssessment {
    pub kind: AssessmentKind,
    pub label: RegimeLabel,
    /// Confidence in the label [0.0, 1.0].
    pub confidence: f64,
    /// Named sub-metrics behind the decision, sorted by name.
    pub evidence: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RegimeAssessment {
    /// Safe default for a failed classification.
    pub fn degraded(err: &CoreError) -> Self {
        let mut evidence = BTreeMap::new();
        evidence.insert("error".to_string(), 1.0);
        Self {
            kind: err.kind(),
            label: RegimeLabel::Trend,
            confidence: DEGRADED_CONFIDENCE,
            evidence,
            detail: Some(err.to_string()),
        }
    }
}

// =============================================================================
// Snapshot extraction
// =============================================================================

impl RegimeSnapshot {
    /// Derive the snapshot for the last bar of `bars`.
    pub fn from_bars(bars: &[PriceBar], params: &RegimeParams) -> Result<Self, CoreError> {
        if bars.is_empty() {
            return Err(CoreError::MissingInput("index series is empty".into()));
        }
        let min_bars = params.min_bars.max(LONG_MA);
        if bars.len() < min_bars {
            return Err(CoreError::InsufficientHistory {
                needed: min_bars,
                available: bars.len(),
            });
        }

        let window = &bars[bars.len().saturating_sub(params.lookback_bars.max(min_bars))..];
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        let last = closes.len() - 1;
        let close = closes[last];

        let ma20_series = sma_series(&closes, SHORT_MA);
        let ma20 = require(ma20_series[last], "ma20")?;
        let ma60 = require(sma_series(&closes, LONG_MA)[last], "ma60")?;

        let slope_window: Option<Vec<f64>> =
            ma20_series[last + 1 - SLOPE_BARS..].iter().copied().collect();
        let slope_window = require(slope_window, "ma20 slope window")?;
        let slope = require(linear_regression_slope(&slope_window), "ma20 slope")?;
        let slope_mean = slope_window.iter().sum::<f64>() / slope_window.len() as f64;
        let ma20_slope_pct = if slope_mean.abs() > f64::EPSILON {
            slope / slope_mean.abs() * 100.0
        } else {
            0.0
        };

        let directional = directional_series(window, params.adx_period);
        let plus_di = require(directional.plus_di[last], "+DI")?;
        let minus_di = require(directional.minus_di[last], "-DI")?;
        let adx = require(directional.adx[last], "adx")?;

        let atr = require(atr_series(window, params.atr_period)[last], "atr")?;
        let rsi = require(rsi_series(&closes, params.rsi_period)[last], "rsi")?;
        let close_std20 = require(std_dev(&closes[last + 1 - BAND_WINDOW..]), "close std")?;

        let bands = bollinger_series(&closes, BAND_WINDOW, BAND_STD);
        let widths: Vec<f64> = bands[last + 1 - BAND_WINDOW..]
            .iter()
            .flatten()
            .map(|b| b.width)
            .collect();
        let bandwidth = require(bands[last].map(|b| b.width), "bandwidth")?;
        let bandwidth_p20 = require(percentile(&widths, SQUEEZE_PERCENTILE), "bandwidth percentile")?;

        let volume = window[last].volume();
        let volume_avg20 = volume_sma_series(window, BAND_WINDOW)[last];

        let snapshot = Self {
            close,
            ma20,
            ma60,
            ma20_slope_pct,
            plus_di,
            minus_di,
            adx,
            atr,
            rsi,
            close_std20,
            bandwidth,
            bandwidth_p20,
            volume,
            volume_avg20,
        };
        if snapshot.all_finite() {
            Ok(snapshot)
        } else {
            Err(CoreError::Compute("non-finite regime feature".into()))
        }
    }

    fn all_finite(&self) -> bool {
        [
            self.close,
            self.ma20,
            self.ma60,
            self.ma20_slope_pct,
            self.plus_di,
            self.minus_di,
            self.adx,
            self.atr,
            self.rsi,
            self.close_std20,
            self.bandwidth,
            self.bandwidth_p20,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::Compute(format!("{name} unavailable")))
}

// =============================================================================
// RegimeClassifier
// =============================================================================

/// Stateless classifier over index bars.
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    params: RegimeParams,
}

impl RegimeClassifier {
    pub fn new(params: RegimeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RegimeParams {
        &self.params
    }

    /// Classify the last bar of `bars` (oldest first).  Never fails: errors
    /// are logged and degrade to the TREND default.
    pub fn assess(&self, bars: &[PriceBar]) -> RegimeAssessment {
        match RegimeSnapshot::from_bars(bars, &self.params) {
            Ok(snapshot) => classify(&snapshot),
            Err(err) => {
                let date = bars.last().map(|b| b.date.to_string()).unwrap_or_default();
                match err {
                    CoreError::InsufficientHistory { .. } => {
                        debug!(date = %date, error = %err, "regime: warm-up, using default");
                    }
                    _ => warn!(date = %date, error = %err, "regime: classification degraded"),
                }
                RegimeAssessment::degraded(&err)
            }
        }
    }
}

// =============================================================================
// Classification logic
// =============================================================================

/// Determine the regime, confidence and evidence from a snapshot.  Pure and
/// deterministic.
pub fn classify(s: &RegimeSnapshot) -> RegimeAssessment {
    let mut evidence = BTreeMap::new();
    evidence.insert("close".to_string(), s.close);
    evidence.insert("ma20".to_string(), s.ma20);
    evidence.insert("ma60".to_string(), s.ma60);
    evidence.insert("ma20_slope_pct".to_string(), s.ma20_slope_pct);
    evidence.insert("plus_di".to_string(), s.plus_di);
    evidence.insert("minus_di".to_string(), s.minus_di);
    evidence.insert("adx".to_string(), s.adx);
    evidence.insert("atr".to_string(), s.atr);
    evidence.insert("rsi".to_string(), s.rsi);
    evidence.insert("bandwidth".to_string(), s.bandwidth);
    evidence.insert("bandwidth_p20".to_string(), s.bandwidth_p20);
    if let Some(ratio) = volume_ratio(s) {
        evidence.insert("volume_ratio".to_string(), ratio);
    }

    // 1. TREND — structure + strength.
    let structure = [
        s.close > s.ma60,
        s.ma20_slope_pct > SLOPE_THRESHOLD_PCT,
        s.plus_di > s.minus_di,
    ]
    .iter()
    .filter(|c| **c)
    .count() as f64
        / 3.0;
    let distance = if s.atr > 0.0 {
        ((s.close - s.ma60) / s.atr / 2.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let strength = (adx_contribution(s.adx) + distance) / 2.0;
    let trend_confidence = 0.65 * structure + 0.35 * strength;

    evidence.insert("structure_score".to_string(), structure);
    evidence.insert("strength_score".to_string(), strength);
    evidence.insert("trend_distance".to_string(), distance);
    evidence.insert("trend_confidence".to_string(), trend_confidence);

    if structure >= TREND_MIN_STRUCTURE && trend_confidence >= TREND_MIN_CONFIDENCE {
        return finish(RegimeLabel::Trend, trend_confidence, evidence);
    }

    // 2. BREAKOUT — compression near the mean.
    let mut breakout = 0.0;
    if s.bandwidth <= s.bandwidth_p20 {
        breakout += 0.4;
    }
    if s.ma20.abs() > f64::EPSILON && ((s.close - s.ma20) / s.ma20).abs() <= 0.03 {
        breakout += 0.3;
    }
    if s.adx < 25.0 {
        breakout += 0.2;
    }
    if volume_ratio(s).is_some_and(|r| r > 1.2) {
        breakout += 0.1;
    }
    evidence.insert("breakout_score".to_string(), breakout);

    if breakout >= BRANCH_MIN_SCORE {
        return finish(RegimeLabel::Breakout, breakout, evidence);
    }

    // 3. REVERSION — fallback.
    let mut reversion = 0.0;
    let (ma_lo, ma_hi) = (s.ma20.min(s.ma60), s.ma20.max(s.ma60));
    if s.close >= ma_lo && s.close <= ma_hi {
        reversion += 0.3;
    }
    if s.adx < 20.0 {
        reversion += 0.3;
    }
    if s.rsi < 30.0 || s.rsi > 70.0 {
        reversion += 0.2;
    }
    if s.close_std20 > 0.0 && (s.close - s.ma20).abs() > 1.5 * s.close_std20 {
        reversion += 0.2;
    }
    evidence.insert("reversion_score".to_string(), reversion);

    if reversion >= BRANCH_MIN_SCORE {
        return finish(RegimeLabel::Reversion, reversion, evidence);
    }

    trace!(
        structure = format!("{:.2}", structure),
        breakout = format!("{:.2}", breakout),
        reversion = format!("{:.2}", reversion),
        "Regime: no rule matched, defaulting to REVERSION"
    );
    finish(RegimeLabel::Reversion, DEGRADED_CONFIDENCE, evidence)
}

fn finish(label: RegimeLabel, confidence: f64, evidence: BTreeMap<String, f64>) -> RegimeAssessment {
    let confidence = confidence.clamp(0.0, 1.0);
    debug!(
        regime = %label,
        confidence = format!("{:.2}", confidence),
        adx = format!("{:.2}", evidence.get("adx").copied().unwrap_or_default()),
        "Regime classified"
    );
    RegimeAssessment {
        kind: AssessmentKind::Ok,
        label,
        confidence,
        evidence,
        detail: None,
    }
}

fn volume_ratio(s: &RegimeSnapshot) -> Option<f64> {
    let avg = s.volume_avg20.filter(|a| *a > 0.0)?;
    let ratio = s.volume? / avg;
    ratio.is_finite().then_some(ratio)
}

/// Piecewise-linear ADX contribution to trend strength:
/// 1.0 at ADX >= 30, 0.8 at 25, 0.6 at 20, 0.4 at 15, linear to 0 below 15.
pub fn adx_contribution(adx: f64) -> f64 {
    if !adx.is_finite() || adx <= 0.0 {
        0.0
    } else if adx >= 30.0 {
        1.0
    } else if adx >= 25.0 {
        remap(adx, 25.0, 30.0, 0.8, 1.0)
    } else if adx >= 20.0 {
        remap(adx, 20.0, 25.0, 0.6, 0.8)
    } else if adx >= 15.0 {
        remap(adx, 15.0, 20.0, 0.4, 0.6)
    } else {
        remap(adx, 0.0, 15.0, 0.0, 0.4)
    }
}
