// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ).  Two derived metrics are exposed:
//
//   width     = (upper - lower) / middle * 100      (Bollinger Band Width)
//   percent_b = (close - lower) / (upper - lower)    (position inside the band)
//
// Width feeds the regime classifier's squeeze test; %b feeds band-position
// scoring and the reversion regime-match rule.

use crate::indicators::stats::std_dev;

/// Bollinger values for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
    /// Position of the close inside the band.  0.5 when the band has no width.
    pub percent_b: f64,
}

/// Calculate Bollinger Bands for one window of closes ending at the last
/// element of `window`.
///
/// Returns `None` when the window is empty, the middle band is zero
/// (degenerate input), or any value is non-finite.
pub fn bollinger_point(window: &[f64], num_std: f64) -> Option<BollingerPoint> {
    let close = *window.last()?;
    let middle = window.iter().sum::<f64>() / window.len() as f64;
    if middle == 0.0 || !middle.is_finite() {
        return None;
    }
    let sigma = std_dev(window)?;

    let upper = middle + num_std * sigma;
    let lower = middle - num_std * sigma;
    let width = (upper - lower) / middle * 100.0;
    let band = upper - lower;
    let percent_b = if band > 0.0 {
        (close - lower) / band
    } else {
        0.5
    };

    if width.is_finite() && percent_b.is_finite() {
        Some(BollingerPoint {
            upper,
            middle,
            lower,
            width,
            percent_b,
        })
    } else {
        None
    }
}

/// Bollinger Bands aligned with `closes`; the first `period - 1` slots are
/// `None`.
pub fn bollinger_series(closes: &[f64], period: usize, num_std: f64) -> Vec<Option<BollingerPoint>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return result;
    }
    for end in period - 1..closes.len() {
        result[end] = bollinger_point(&closes[end + 1 - period..=end], num_std);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = bollinger_series(&closes, 20, 2.0)[19].unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert!(bb.width > 0.0);
        // Last close is the highest of an ascending window: upper half.
        assert!(bb.percent_b > 0.5);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let closes = vec![1.0, 2.0, 3.0];
        assert!(bollinger_series(&closes, 20, 2.0).iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat() {
        let closes = vec![100.0; 20];
        let bb = bollinger_series(&closes, 20, 2.0)[19].unwrap();
        assert!((bb.width - 0.0).abs() < 1e-10);
        assert!((bb.percent_b - 0.5).abs() < 1e-10);
    }

    #[test]
    fn bollinger_zero_middle_is_none() {
        let closes = vec![0.0; 20];
        assert!(bollinger_series(&closes, 20, 2.0)[19].is_none());
    }
}
