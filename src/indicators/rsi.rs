// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3 — Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

/// Compute the RSI series for `closes`, aligned with the input.
///
/// Slot `period` holds the first value (the first `period` deltas seed the
/// averages); earlier slots are `None`.
///
/// # Edge cases
/// - `period == 0` or `closes.len() < period + 1` => all `None`
/// - If average loss is zero (no down moves), RSI is 100.0.
/// - If there is no movement at all, RSI is 50.0.
/// - A non-finite result stops the series.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    // --- Compute price deltas ------------------------------------------------
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    match rsi_from_averages(avg_gain, avg_loss) {
        Some(first) => result[period] = Some(first),
        None => return result,
    }

    // --- Wilder's smoothing for subsequent values ----------------------------
    for (offset, &delta) in deltas[period..].iter().enumerate() {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result[period + 1 + offset] = Some(rsi),
            None => break,
        }
    }

    result
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // No movement at all — neutral.
    } else if avg_loss == 0.0 {
        100.0 // All gains, no losses.
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn defined(series: &[Option<f64>]) -> Vec<f64> {
        series.iter().filter_map(|v| *v).collect()
    }

    #[test]
    fn rsi_empty_input() {
        assert!(rsi_series(&[], 14).is_empty());
    }

    #[test]
    fn rsi_insufficient_data() {
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(rsi_series(&closes, 14).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_alignment() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let series = rsi_series(&closes, 14);
        assert_eq!(series.len(), 20);
        assert!(series[13].is_none());
        assert!(series[14].is_some());
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in defined(&rsi_series(&closes, 14)) {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in defined(&rsi_series(&closes, 14)) {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market() {
        let closes = vec![100.0; 30];
        let values = defined(&rsi_series(&closes, 14));
        assert!(!values.is_empty());
        for v in values {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in defined(&rsi_series(&closes, 14)) {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }
}
