// =============================================================================
// Rolling statistics helpers
// =============================================================================
//
// Population standard deviation, ordinary-least-squares slope and linearly
// interpolated percentiles.  Used by the regime classifier and by the
// Bollinger / volume indicators.

/// Population standard deviation of `window`.  `None` for an empty or
/// non-finite window.
pub fn std_dev(window: &[f64]) -> Option<f64> {
    if window.is_empty() || window.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Rolling population standard deviation, aligned with `values`.
pub fn rolling_std_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }
    for end in period - 1..values.len() {
        result[end] = std_dev(&values[end + 1 - period..=end]);
    }
    result
}

/// OLS slope of `values` against their index (units per step).
///
/// Returns `None` for fewer than two points or non-finite input.
pub fn linear_regression_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (mut num, mut den) = (0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Percentile `q` (0..=100) of `values`, linearly interpolated between the
/// closest ranks.  Non-finite values are ignored.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() || !q.is_finite() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Linearly remap `value` from `[in_lo, in_hi]` to `[out_lo, out_hi]`, clamped
/// to the output range.
pub fn remap(value: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    let t = if (in_hi - in_lo).abs() < f64::EPSILON {
        0.5
    } else {
        (value - in_lo) / (in_hi - in_lo)
    };
    out_lo + t.clamp(0.0, 1.0) * (out_hi - out_lo)
}

/// Clamp a score into the canonical `[0, 100]` band.  NaN maps to neutral 50.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        50.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_flat_is_zero() {
        assert!((std_dev(&[3.0; 10]).unwrap()).abs() < 1e-12);
        assert!(std_dev(&[]).is_none());
        assert!(std_dev(&[1.0, f64::NAN]).is_none());
    }

    #[test]
    fn rolling_std_alignment() {
        let s = rolling_std_series(&[1.0, 3.0, 1.0, 3.0], 2);
        assert!(s[0].is_none());
        for v in &s[1..] {
            assert!((v.unwrap() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn slope_of_line() {
        let values: Vec<f64> = (0..7).map(|i| 10.0 + 2.5 * i as f64).collect();
        assert!((linear_regression_slope(&values).unwrap() - 2.5).abs() < 1e-12);
        assert!(linear_regression_slope(&[1.0]).is_none());
    }

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile(&values, 0.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((percentile(&values, 50.0).unwrap() - 3.0).abs() < 1e-12);
        assert!((percentile(&values, 20.0).unwrap() - 1.8).abs() < 1e-12);
        assert!((percentile(&values, 100.0).unwrap() - 5.0).abs() < 1e-12);
        assert!(percentile(&[], 50.0).is_none());
    }

    #[test]
    fn test_remap() {
        assert!((remap(0.5, 0.0, 1.0, 0.0, 10.0) - 5.0).abs() < 1e-10);
        assert!((remap(2.0, 0.0, 1.0, 0.0, 10.0) - 10.0).abs() < 1e-10);
        assert!((remap(-1.0, 0.0, 1.0, 0.0, 10.0) - 0.0).abs() < 1e-10);
        // Descending output range.
        assert!((remap(30.0, 30.0, 70.0, 90.0, 15.0) - 90.0).abs() < 1e-10);
        assert!((remap(70.0, 30.0, 70.0, 90.0, 15.0) - 15.0).abs() < 1e-10);
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(120.0), 100.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(f64::NAN), 50.0);
        assert_eq!(clamp_score(f64::INFINITY), 100.0);
    }
}
