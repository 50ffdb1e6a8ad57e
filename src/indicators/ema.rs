// =============================================================================
// Moving Averages (SMA / EMA) and moving-average stack alignment
// =============================================================================
//
// SMA_t = mean(close_{t-period+1} ..= close_t)
//
// EMA:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` values.
// Every series returned here is aligned with its input: slot `i` belongs to
// input `i` and warm-up slots are `None`.
// =============================================================================

/// Simple moving average, aligned with `values`.
///
/// Windows containing a non-finite value yield `None`.
pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let period_f = period as f64;
    for end in period - 1..values.len() {
        let window = &values[end + 1 - period..=end];
        if window.iter().all(|v| v.is_finite()) {
            result[end] = Some(window.iter().sum::<f64>() / period_f);
        }
    }
    result
}

/// Exponential moving average, aligned with `values`.
///
/// # Edge cases
/// - `period == 0` or `values.len() < period` => all `None`
/// - A non-finite value stops the series; later slots stay `None` because a
///   broken EMA cannot be trusted downstream.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return result;
    }
    result[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &value) in values.iter().enumerate().skip(period) {
        let ema = value * multiplier + prev * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result[i] = Some(ema);
        prev = ema;
    }
    result
}

/// EMA over a series that itself has a warm-up prefix (e.g. the MACD line).
/// The EMA is computed over the contiguous defined suffix and re-aligned.
pub fn ema_of_aligned(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    let Some(start) = values.iter().position(Option::is_some) else {
        return result;
    };
    let tail: Vec<f64> = values[start..]
        .iter()
        .map_while(|v| *v)
        .collect();
    for (offset, v) in ema_series(&tail, period).into_iter().enumerate() {
        result[start + offset] = v;
    }
    result
}

/// Check whether a stack of moving averages is strictly ordered, shortest on
/// top: `ma[0] > ma[1] > ... > ma[n-1]`.
///
/// `mas` must be ordered from the shortest window to the longest.  Returns
/// `None` when any average is missing or fewer than two are supplied.
pub fn ma_stack_aligned(mas: &[Option<f64>]) -> Option<bool> {
    if mas.len() < 2 {
        return None;
    }
    let values: Option<Vec<f64>> = mas.iter().copied().collect();
    let values = values?;
    Some(values.windows(2).all(|w| w[0] > w[1]))
}

/// Fraction of adjacent pairs in the stack that are bullishly ordered
/// (shorter above longer), in `[0, 1]`.  Missing averages are skipped.
pub fn ma_stack_fraction(mas: &[Option<f64>]) -> Option<f64> {
    let values: Vec<f64> = mas.iter().filter_map(|v| *v).collect();
    if values.len() < 2 {
        return None;
    }
    let pairs = values.len() - 1;
    let bullish = values.windows(2).filter(|w| w[0] > w[1]).count();
    Some(bullish as f64 / pairs as f64)
}
