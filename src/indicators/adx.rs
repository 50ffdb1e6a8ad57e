// =============================================================================
// Average Directional Index (ADX) and Directional Indicators (±DI)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. Compute +DM (positive directional movement) and -DM per bar.
//   2. Compute True Range (TR) per bar.
//   3. Smooth +DM, -DM and TR with a simple moving average over `period`.
//   4. Derive +DI = smoothed(+DM) / smoothed(TR) * 100
//            -DI = smoothed(-DM) / smoothed(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = simple moving average of DX over `period` bars.
//
// A zero smoothed TR floors both DIs to 0, and a zero DI sum floors DX to 0,
// so no NaN / inf ever leaves this module.
//
// Interpretation:
//   ADX > 25  => trending market
//   ADX < 20  => ranging / choppy market
// =============================================================================

use crate::indicators::atr::true_range_series;
use crate::market_data::PriceBar;

/// ±DI and ADX aligned with the input bars.
///
/// ±DI is defined from slot `period`; ADX from slot `2 * period - 1`.
#[derive(Debug, Clone, Default)]
pub struct DirectionalSeries {
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
    pub adx: Vec<Option<f64>>,
}

/// Compute ±DI and ADX for `bars` with SMA smoothing.
pub fn directional_series(bars: &[PriceBar], period: usize) -> DirectionalSeries {
    let n = bars.len();
    let mut out = DirectionalSeries {
        plus_di: vec![None; n],
        minus_di: vec![None; n],
        adx: vec![None; n],
    };
    if period == 0 || n < period + 1 {
        return out;
    }

    // ------------------------------------------------------------------
    // Step 1 & 2: Raw +DM, -DM, and True Range per bar (slot 0 unused)
    // ------------------------------------------------------------------
    let tr = true_range_series(bars);
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up_move = bars[i].high() - bars[i - 1].high();
        let down_move = bars[i - 1].low() - bars[i].low();

        plus_dm[i] = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        minus_dm[i] = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
    }

    // ------------------------------------------------------------------
    // Step 3–5: SMA-smoothed DI and DX
    // ------------------------------------------------------------------
    let period_f = period as f64;
    let mut dx: Vec<Option<f64>> = vec![None; n];
    for end in period..n {
        let start = end + 1 - period;
        let tr_window: Option<Vec<f64>> = tr[start..=end].iter().copied().collect();
        let Some(tr_window) = tr_window else { continue };

        let smooth_tr = tr_window.iter().sum::<f64>() / period_f;
        let smooth_plus = plus_dm[start..=end].iter().sum::<f64>() / period_f;
        let smooth_minus = minus_dm[start..=end].iter().sum::<f64>() / period_f;

        let (plus_di, minus_di) = directional_indicators(smooth_plus, smooth_minus, smooth_tr);
        out.plus_di[end] = Some(plus_di);
        out.minus_di[end] = Some(minus_di);
        dx[end] = Some(compute_dx(plus_di, minus_di));
    }

    // ------------------------------------------------------------------
    // Step 6: ADX = SMA of DX
    // ------------------------------------------------------------------
    for end in period..n {
        if end + 1 < 2 * period {
            continue;
        }
        let window: Option<Vec<f64>> = dx[end + 1 - period..=end].iter().copied().collect();
        if let Some(window) = window {
            out.adx[end] = Some(window.iter().sum::<f64>() / period_f);
        }
    }

    out
}

// =============================================================================
// Internal helpers
// =============================================================================

/// ±DI from smoothed directional movement and TR, floored to 0 on a zero or
/// non-finite denominator.
fn directional_indicators(smooth_plus: f64, smooth_minus: f64, smooth_tr: f64) -> (f64, f64) {
    if smooth_tr <= 0.0 || !smooth_tr.is_finite() {
        return (0.0, 0.0);
    }
    let plus = smooth_plus / smooth_tr * 100.0;
    let minus = smooth_minus / smooth_tr * 100.0;
    (finite_or_zero(plus), finite_or_zero(minus))
}

/// DX from ±DI; 0 when both are 0.
fn compute_dx(plus_di: f64, minus_di: f64) -> f64 {
    let di_sum = plus_di + minus_di;
    if di_sum <= 0.0 {
        return 0.0;
    }
    finite_or_zero((plus_di - minus_di).abs() / di_sum * 100.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
