// =============================================================================
// FeatureFrame — per-date derived indicator columns for one bar series
// =============================================================================
//
// Computed once per symbol from an `IndicatorParams` block.  Every column is
// aligned with the input bars.  Sub-score calculators read columns directly or
// by canonical name through `value`.

use chrono::NaiveDate;

use crate::indicators::adx::{directional_series, DirectionalSeries};
use crate::indicators::bollinger::{bollinger_series, BollingerPoint};
use crate::indicators::ema::sma_series;
use crate::indicators::macd::{macd_series, MacdPoint};
use crate::indicators::rsi::rsi_series;
use crate::indicators::stochastic::{stochastic_series, StochasticPoint};
use crate::indicators::volume::{obv_series, volume_ratio_series, volume_sma_series};
use crate::market_data::PriceBar;
use crate::runtime_config::IndicatorParams;

#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    /// Moving-average windows, ascending.  `ma[j]` is the SMA over
    /// `ma_windows[j]` bars.
    pub ma_windows: Vec<usize>,
    pub ma: Vec<Vec<Option<f64>>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<MacdPoint>>,
    pub stochastic: Vec<Option<StochasticPoint>>,
    pub directional: DirectionalSeries,
    pub bollinger: Vec<Option<BollingerPoint>>,
    pub volume: Vec<Option<f64>>,
    pub volume_ma: Vec<Option<f64>>,
    pub volume_ratio: Vec<Option<f64>>,
    pub obv: Vec<Option<f64>>,
}

impl FeatureFrame {
    pub fn compute(bars: &[PriceBar], params: &IndicatorParams) -> Self {
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ma_windows = params.sorted_ma_windows();
        let ma = ma_windows.iter().map(|w| sma_series(&close, *w)).collect();

        Self {
            dates: bars.iter().map(|b| b.date).collect(),
            ma_windows,
            ma,
            rsi: rsi_series(&close, params.rsi_period),
            macd: macd_series(&close, params.macd_fast, params.macd_slow, params.macd_signal),
            stochastic: stochastic_series(bars, params.stoch_k_period, params.stoch_d_period),
            directional: directional_series(bars, params.adx_period),
            bollinger: bollinger_series(&close, params.bb_period, params.bb_std),
            volume: bars.iter().map(PriceBar::volume).collect(),
            volume_ma: volume_sma_series(bars, params.volume_window),
            volume_ratio: volume_ratio_series(bars, params.volume_window),
            obv: obv_series(bars),
            close,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Moving averages at slot `i`, shortest window first.
    pub fn ma_stack(&self, i: usize) -> Vec<Option<f64>> {
        self.ma.iter().map(|col| col.get(i).copied().flatten()).collect()
    }

    /// Look up a column by canonical name at slot `i`.
    ///
    /// Names: `close`, `ma<N>`, `rsi`, `macd`, `macd_signal`, `macd_hist`,
    /// `stoch_k`, `stoch_d`, `plus_di`, `minus_di`, `adx`, `bb_upper`,
    /// `bb_middle`, `bb_lower`, `bb_width`, `bb_percent_b`, `volume`,
    /// `volume_ma`, `volume_ratio`, `obv`.  Unknown names yield `None`.
    pub fn value(&self, name: &str, i: usize) -> Option<f64> {
        let at = |col: &Vec<Option<f64>>| col.get(i).copied().flatten();
        let macd = || self.macd.get(i).copied().flatten();
        let stoch = || self.stochastic.get(i).copied().flatten();
        let band = || self.bollinger.get(i).copied().flatten();

        match name {
            "close" => self.close.get(i).copied(),
            "rsi" => at(&self.rsi),
            "macd" => macd().map(|m| m.line),
            "macd_signal" => macd().map(|m| m.signal),
            "macd_hist" => macd().map(|m| m.histogram),
            "stoch_k" => stoch().map(|s| s.k),
            "stoch_d" => stoch().map(|s| s.d),
            "plus_di" => at(&self.directional.plus_di),
            "minus_di" => at(&self.directional.minus_di),
            "adx" => at(&self.directional.adx),
            "bb_upper" => band().map(|b| b.upper),
            "bb_middle" => band().map(|b| b.middle),
            "bb_lower" => band().map(|b| b.lower),
            "bb_width" => band().map(|b| b.width),
            "bb_percent_b" => band().map(|b| b.percent_b),
            "volume" => at(&self.volume),
            "volume_ma" => at(&self.volume_ma),
            "volume_ratio" => at(&self.volume_ratio),
            "obv" => at(&self.obv),
            other => {
                let window: usize = other.strip_prefix("ma")?.parse().ok()?;
                let j = self.ma_windows.iter().position(|w| *w == window)?;
                at(&self.ma[j])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let c = 10.0 + i as f64;
                PriceBar::new(start + chrono::Duration::days(i as i64), c)
                    .with_range(c + 0.5, c - 0.5)
                    .with_volume(1_000.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn columns_are_aligned_with_bars() {
        let bars = rising(80);
        let frame = FeatureFrame::compute(&bars, &IndicatorParams::default());
        assert_eq!(frame.len(), 80);
        assert_eq!(frame.rsi.len(), 80);
        assert_eq!(frame.macd.len(), 80);
        assert_eq!(frame.directional.adx.len(), 80);
        assert!(frame.ma.iter().all(|col| col.len() == 80));
    }

    #[test]
    fn lookup_by_name() {
        let bars = rising(80);
        let frame = FeatureFrame::compute(&bars, &IndicatorParams::default());
        assert_eq!(frame.value("close", 79), Some(89.0));
        // SMA(5) of 85..=89
        assert!((frame.value("ma5", 79).unwrap() - 87.0).abs() < 1e-12);
        assert!(frame.value("ma60", 58).is_none());
        assert!(frame.value("ma60", 59).is_some());
        assert!(frame.value("ma7", 79).is_none());
        assert!(frame.value("nonsense", 79).is_none());
        // ATR is a regime input only; the symbol frame does not carry it.
        assert!(frame.value("atr", 79).is_none());
        assert!(frame.value("rsi", 200).is_none());
    }

    #[test]
    fn stack_is_shortest_first() {
        let bars = rising(80);
        let frame = FeatureFrame::compute(&bars, &IndicatorParams::default());
        let stack = frame.ma_stack(79);
        assert_eq!(stack.len(), 4);
        let values: Vec<f64> = stack.into_iter().flatten().collect();
        assert!(values.windows(2).all(|w| w[0] > w[1]));
    }
}
