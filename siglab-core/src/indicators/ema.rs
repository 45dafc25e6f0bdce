//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2/(span+1).
//! Seed: EMA[0] = close[0]. Values before index span-1 are reported absent.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema{span}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.span - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        compute_ema(closes, self.span)
    }
}

/// EMA of a series. A non-finite value taints everything after it.
pub fn compute_ema(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if span == 0 || n < span {
        return result;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return result;
        }
        let ema = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        prev = Some(ema);
        if i + 1 >= span {
            result[i] = Some(ema);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn ema_span_1_equals_close() {
        let result = compute_ema(&[100.0, 200.0, 300.0], 1);
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, seed 10
        // t1 = 10.5, t2 = 11.25, t3 = 12.125
        let result = compute_ema(&[10.0, 11.0, 12.0, 13.0], 3);
        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_approx(result[2].unwrap(), 11.25, DEFAULT_EPSILON);
        assert_approx(result[3].unwrap(), 12.125, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_taints_rest() {
        let result = compute_ema(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 2);
        assert!(result[2].is_some());
        assert!(result[3].is_none());
        assert!(result[4].is_none());
    }
}
