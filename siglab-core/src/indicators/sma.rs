//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        compute_sma(closes, self.period)
    }
}

/// Rolling mean; a window containing a non-finite value is absent.
pub fn compute_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut bad = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() {
            sum += v;
        } else {
            bad += 1;
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_finite() {
                sum -= leaving;
            } else {
                bad -= 1;
            }
        }
        if i + 1 >= period && bad == 0 {
            result[i] = Some(sum / period as f64);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let result = compute_sma(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0], 5);
        assert_eq!(result.len(), 7);
        assert!(result[..4].iter().all(|v| v.is_none()));
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_window_is_absent() {
        let result = compute_sma(&[10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0], 3);
        assert!(result[2].is_none());
        assert!(result[3].is_none());
        assert!(result[4].is_none());
        assert_approx(result[5].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_few_bars() {
        let sma = Sma::new(5);
        assert!(sma.compute(&[10.0, 11.0]).iter().all(|v| v.is_none()));
        assert_eq!(sma.name(), "sma5");
    }
}
