// =============================================================================
// Volume indicators — average, relative volume, On-Balance Volume
// =============================================================================
//
// Volume is optional on every bar.  A window containing a missing volume has
// no average, and a zero average has no ratio: callers skip those dates
// instead of scoring them as zero.

use crate::market_data::PriceBar;

/// Simple moving average of volume, aligned with `bars`.
pub fn volume_sma_series(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return result;
    }
    for end in period - 1..bars.len() {
        let window: Option<Vec<f64>> = bars[end + 1 - period..=end]
            .iter()
            .map(PriceBar::volume)
            .collect();
        if let Some(window) = window {
            result[end] = Some(window.iter().sum::<f64>() / period as f64);
        }
    }
    result
}

/// Relative volume: today's volume over its `period`-bar average (the
/// average includes today).  `None` when either is missing or the average is
/// not positive.
pub fn volume_ratio_series(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    volume_sma_series(bars, period)
        .into_iter()
        .zip(bars)
        .map(|(avg, bar)| {
            let avg = avg.filter(|a| *a > 0.0)?;
            let ratio = bar.volume()? / avg;
            ratio.is_finite().then_some(ratio)
        })
        .collect()
}

/// On-Balance Volume aligned with `bars`.  Slots whose bar has no volume are
/// `None`; the running total carries across them unchanged.
pub fn obv_series(bars: &[PriceBar]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        let Some(volume) = bar.volume() else {
            result.push(None);
            continue;
        };
        if i > 0 {
            let prev = bars[i - 1].close;
            if bar.close > prev {
                obv += volume;
            } else if bar.close < prev {
                obv -= volume;
            }
        }
        result.push(Some(obv));
    }
    result
}
