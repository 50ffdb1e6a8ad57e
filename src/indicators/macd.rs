// =============================================================================
// MACD — Moving Average Convergence / Divergence
// =============================================================================
//
//   line      = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of line
//   histogram = line - signal
//
// Defaults: fast 12, slow 26, signal 9.

use crate::indicators::ema::{ema_of_aligned, ema_series};

/// MACD values for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute MACD aligned with `closes`.  A slot is `Some` only once the signal
/// line is available (`slow + signal - 2` bars of warm-up).
pub fn macd_series(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Vec<Option<MacdPoint>> {
    let n = closes.len();
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow {
        return vec![None; n];
    }

    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);
    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of_aligned(&line, signal);

    line.iter()
        .zip(&signal_line)
        .map(|(l, s)| {
            let (line, signal) = ((*l)?, (*s)?);
            Some(MacdPoint {
                line,
                signal,
                histogram: line - signal,
            })
        })
        .collect()
}
