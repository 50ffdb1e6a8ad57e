// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
//   %K = 100 * (close - lowest_low_k) / (highest_high_k - lowest_low_k)
//   %D = SMA(d_period) of %K
//
// A zero high-low range (flat window) maps %K to a neutral 50 instead of
// dividing by zero.

use crate::market_data::PriceBar;

/// Stochastic values for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticPoint {
    pub k: f64,
    pub d: f64,
}

/// Compute %K / %D aligned with `bars`.
pub fn stochastic_series(
    bars: &[PriceBar],
    k_period: usize,
    d_period: usize,
) -> Vec<Option<StochasticPoint>> {
    let n = bars.len();
    let mut result = vec![None; n];
    if k_period == 0 || d_period == 0 || n < k_period {
        return result;
    }

    let mut k_values: Vec<Option<f64>> = vec![None; n];
    for end in k_period - 1..n {
        let window = &bars[end + 1 - k_period..=end];
        let highest = window.iter().map(PriceBar::high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(PriceBar::low).fold(f64::MAX, f64::min);
        let range = highest - lowest;
        let k = if range > 0.0 {
            100.0 * (bars[end].close - lowest) / range
        } else {
            50.0
        };
        if k.is_finite() {
            k_values[end] = Some(k.clamp(0.0, 100.0));
        }
    }

    for end in 0..n {
        let Some(k) = k_values[end] else { continue };
        if end + 1 < d_period {
            continue;
        }
        let window = &k_values[end + 1 - d_period..=end];
        let defined: Option<Vec<f64>> = window.iter().copied().collect();
        if let Some(defined) = defined {
            let d = defined.iter().sum::<f64>() / d_period as f64;
            result[end] = Some(StochasticPoint { k, d });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                PriceBar::new(start + chrono::Duration::days(i as i64), c)
                    .with_range(c + 1.0, c - 1.0)
            })
            .collect()
    }

    #[test]
    fn stochastic_warmup() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let stoch = stochastic_series(&bars(&closes), 14, 3);
        // %K from index 13, %D needs two more.
        assert!(stoch[14].is_none());
        assert!(stoch[15].is_some());
    }

    #[test]
    fn stochastic_bounds() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin() * 8.0).collect();
        for p in stochastic_series(&bars(&closes), 14, 3).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&p.k));
            assert!((0.0..=100.0).contains(&p.d));
        }
    }

    #[test]
    fn stochastic_flat_is_neutral() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let flat: Vec<PriceBar> = (0..20)
            .map(|i| PriceBar::new(start + chrono::Duration::days(i), 10.0))
            .collect();
        let last = stochastic_series(&flat, 14, 3)[19].unwrap();
        assert!((last.k - 50.0).abs() < 1e-12);
        assert!((last.d - 50.0).abs() < 1e-12);
    }
}
