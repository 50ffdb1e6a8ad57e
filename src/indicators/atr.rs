// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Bars without high/low use the close for both, so a close-only series
// degrades to |close - prevClose|.
// =============================================================================

use crate::market_data::PriceBar;

/// True range per bar, aligned with `bars`.  Slot 0 is `None` (no previous
/// close).
pub fn true_range_series(bars: &[PriceBar]) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    for i in 1..bars.len() {
        let high = bars[i].high();
        let low = bars[i].low();
        let prev_close = bars[i - 1].close;

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        if tr.is_finite() {
            result[i] = Some(tr);
        }
    }
    result
}

/// Compute the ATR series aligned with `bars`.
///
/// The first value sits at slot `period` (it needs `period` TR values, each
/// requiring a previous bar).  A non-finite TR stops the series.
pub fn atr_series(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return result;
    }

    let tr = true_range_series(bars);

    // --- Seed ATR with SMA of first `period` TR values ---------------------
    let seed: Option<Vec<f64>> = tr[1..=period].iter().copied().collect();
    let Some(seed) = seed else {
        return result;
    };
    let period_f = period as f64;
    let mut atr = seed.iter().sum::<f64>() / period_f;
    if !atr.is_finite() {
        return result;
    }
    result[period] = Some(atr);

    // --- Wilder's smoothing for remaining TR values ------------------------
    for i in period + 1..bars.len() {
        let Some(tr) = tr[i] else { break };
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        result[i] = Some(atr);
    }
    result
}
