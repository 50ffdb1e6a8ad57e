// =============================================================================
// Runtime Configuration — engine settings with atomic save
// =============================================================================
//
// Every tunable knob of the regime / scoring / signal pipeline lives here.
// Regime-level and trade-level anti-whipsaw settings are independent
// sections (`hysteresis` vs `signal`) even though both carry a
// `cooldown_days`.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::persistence::write_atomic;
use crate::regime::weights::WeightVector;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_lookback_bars() -> usize {
    120
}

fn default_min_bars() -> usize {
    60
}

fn default_period_14() -> usize {
    14
}

fn default_min_confirm_days() -> usize {
    2
}

fn default_cooldown_days() -> usize {
    3
}

fn default_buy_score() -> f64 {
    60.0
}

fn default_sell_score() -> f64 {
    40.0
}

fn default_confirm_days() -> usize {
    2
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_stoch_d() -> usize {
    3
}

fn default_ma_windows() -> Vec<usize> {
    vec![5, 10, 20, 60]
}

fn default_bb_period() -> usize {
    20
}

fn default_bb_std() -> f64 {
    2.0
}

fn default_volume_window() -> usize {
    20
}

fn default_surge_ratio() -> f64 {
    1.5
}

fn default_volume_conditions() -> Vec<VolumeCondition> {
    vec![
        VolumeCondition::VolumeRatio,
        VolumeCondition::PriceVolume,
        VolumeCondition::ObvTrend,
    ]
}

fn default_patterns() -> Vec<String> {
    [
        "hammer",
        "inverted_hammer",
        "bullish_engulfing",
        "bearish_engulfing",
        "morning_star",
        "evening_star",
        "shooting_star",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// =============================================================================
// Sections
// =============================================================================

/// Market-regime classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    /// Trailing bars handed to the classifier for each evaluation date.
    #[serde(default = "default_lookback_bars")]
    pub lookback_bars: usize,

    /// Minimum index bars before a classification is attempted.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    /// Smoothing period for ADX / ±DI.
    #[serde(default = "default_period_14")]
    pub adx_period: usize,

    /// ATR period used for the trend-distance strength term.
    #[serde(default = "default_period_14")]
    pub atr_period: usize,

    /// RSI period used by the reversion test.
    #[serde(default = "default_period_14")]
    pub rsi_period: usize,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            lookback_bars: default_lookback_bars(),
            min_bars: default_min_bars(),
            adx_period: default_period_14(),
            atr_period: default_period_14(),
            rsi_period: default_period_14(),
        }
    }
}

/// Regime-level debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisParams {
    /// Consecutive classifications required before the stabilised label
    /// switches.
    #[serde(default = "default_min_confirm_days")]
    pub min_confirm_days: usize,

    /// Days after a switch during which an opposite switch is suppressed.
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: usize,
}

impl Default for HysteresisParams {
    fn default() -> Self {
        Self {
            min_confirm_days: default_min_confirm_days(),
            cooldown_days: default_cooldown_days(),
        }
    }
}

/// Trade-level signal generation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    /// Composite score at or above which a day counts toward a buy.
    #[serde(default = "default_buy_score")]
    pub buy_score: f64,

    /// Composite score at or below which a day counts toward a sell.
    #[serde(default = "default_sell_score")]
    pub sell_score: f64,

    #[serde(default = "default_confirm_days")]
    pub buy_confirm_days: usize,

    #[serde(default = "default_confirm_days")]
    pub sell_confirm_days: usize,

    /// Bars after a trade during which the opposite trade is blocked.
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            buy_score: default_buy_score(),
            sell_score: default_sell_score(),
            buy_confirm_days: default_confirm_days(),
            sell_confirm_days: default_confirm_days(),
            cooldown_days: default_cooldown_days(),
        }
    }
}

/// Indicator families feeding the technical sub-score, with their periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_true")]
    pub enable_rsi: bool,
    #[serde(default = "default_period_14")]
    pub rsi_period: usize,

    #[serde(default = "default_true")]
    pub enable_macd: bool,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_true")]
    pub enable_stochastic: bool,
    #[serde(default = "default_period_14")]
    pub stoch_k_period: usize,
    #[serde(default = "default_stoch_d")]
    pub stoch_d_period: usize,

    #[serde(default = "default_true")]
    pub enable_adx: bool,
    #[serde(default = "default_period_14")]
    pub adx_period: usize,

    /// Moving-average alignment across `ma_windows` (shortest first).
    #[serde(default = "default_true")]
    pub enable_ma_alignment: bool,
    #[serde(default = "default_ma_windows")]
    pub ma_windows: Vec<usize>,

    #[serde(default = "default_true")]
    pub enable_bollinger: bool,
    #[serde(default = "default_bb_period")]
    pub bb_period: usize,
    #[serde(default = "default_bb_std")]
    pub bb_std: f64,

    /// Window for the volume average / ratio and OBV slope.
    #[serde(default = "default_volume_window")]
    pub volume_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            enable_rsi: true,
            rsi_period: default_period_14(),
            enable_macd: true,
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            enable_stochastic: true,
            stoch_k_period: default_period_14(),
            stoch_d_period: default_stoch_d(),
            enable_adx: true,
            adx_period: default_period_14(),
            enable_ma_alignment: true,
            ma_windows: default_ma_windows(),
            enable_bollinger: true,
            bb_period: default_bb_period(),
            bb_std: default_bb_std(),
            volume_window: default_volume_window(),
        }
    }
}

impl IndicatorParams {
    /// Same periods, every family switched off.
    pub fn all_disabled() -> Self {
        Self {
            enable_rsi: false,
            enable_macd: false,
            enable_stochastic: false,
            enable_adx: false,
            enable_ma_alignment: false,
            enable_bollinger: false,
            ..Self::default()
        }
    }

    /// `ma_windows` sorted ascending with duplicates and zeros removed.
    pub fn sorted_ma_windows(&self) -> Vec<usize> {
        let mut windows: Vec<usize> = self.ma_windows.iter().copied().filter(|w| *w > 0).collect();
        windows.sort_unstable();
        windows.dedup();
        windows
    }
}

/// Externally detected chart patterns that count toward the pattern score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    #[serde(default = "default_patterns")]
    pub selected: Vec<String>,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            selected: default_patterns(),
        }
    }
}

/// One volume condition contributing to the volume score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeCondition {
    /// Relative volume against its rolling average.
    VolumeRatio,
    /// Up / down day confirmed by above-average volume.
    PriceVolume,
    /// Slope of On-Balance Volume over the volume window.
    ObvTrend,
}

/// Volume scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeParams {
    #[serde(default = "default_volume_conditions")]
    pub conditions: Vec<VolumeCondition>,

    /// Relative volume considered a surge (tagging and the breakout
    /// regime-match rule).
    #[serde(default = "default_surge_ratio")]
    pub surge_ratio: f64,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            conditions: default_volume_conditions(),
            surge_ratio: default_surge_ratio(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the engine.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub regime: RegimeParams,

    #[serde(default)]
    pub hysteresis: HysteresisParams,

    #[serde(default)]
    pub signal: SignalParams,

    #[serde(default)]
    pub indicators: IndicatorParams,

    #[serde(default)]
    pub patterns: PatternParams,

    #[serde(default)]
    pub volume: VolumeParams,

    /// Base sub-score weights before regime adjustment.
    #[serde(default)]
    pub base_weights: WeightVector,
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid runtime config in {}", path.display()))?;

        info!(
            path = %path.display(),
            buy_score = config.signal.buy_score,
            sell_score = config.signal.sell_score,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        write_atomic(path, &content)?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Reject knob combinations the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        let s = &self.signal;
        ensure!(
            s.sell_score < s.buy_score,
            "sell_score ({}) must be below buy_score ({})",
            s.sell_score,
            s.buy_score
        );
        ensure!(
            (0.0..=100.0).contains(&s.buy_score) && (0.0..=100.0).contains(&s.sell_score),
            "signal thresholds must lie in [0, 100]"
        );
        ensure!(
            s.buy_confirm_days >= 1 && s.sell_confirm_days >= 1,
            "confirmation windows must be at least one day"
        );
        ensure!(
            self.hysteresis.min_confirm_days >= 1,
            "hysteresis.min_confirm_days must be at least 1"
        );

        let r = &self.regime;
        ensure!(
            r.adx_period > 0 && r.atr_period > 0 && r.rsi_period > 0,
            "regime periods must be positive"
        );
        ensure!(
            r.lookback_bars >= r.min_bars,
            "regime.lookback_bars ({}) must be >= regime.min_bars ({})",
            r.lookback_bars,
            r.min_bars
        );

        let i = &self.indicators;
        ensure!(
            i.macd_fast < i.macd_slow,
            "macd_fast ({}) must be below macd_slow ({})",
            i.macd_fast,
            i.macd_slow
        );
        ensure!(i.bb_std > 0.0, "bb_std must be positive");
        ensure!(i.volume_window > 0, "volume_window must be positive");

        let w = &self.base_weights;
        ensure!(
            [w.pattern, w.technical, w.volume]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0),
            "base weights must be finite and non-negative"
        );
        Ok(())
    }
}
