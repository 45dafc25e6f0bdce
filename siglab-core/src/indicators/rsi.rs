//! Relative Strength Index (RSI), Wilder smoothing.
//!
//! gain = max(Δ, 0), loss = max(−Δ, 0), both smoothed with one continuous
//! recursive average, α = 1/period:
//!   avg[t] = α * x[t] + (1 − α) * avg[t−1]
//! The recursion starts at the first bar (which contributes a zero change)
//! with no simple-average seeding phase.
//! RSI = 100 − 100 / (1 + avg_gain / avg_loss)
//! Lookback: period − 1. Edge case: avg_loss == 0 → RSI = 100.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        compute_rsi(closes, self.period)
    }
}

/// RSI of a close series, index-aligned with the input.
pub fn compute_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 0..n {
        // A missing neighbour counts as no change.
        let change = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        let change = if change.is_finite() { change } else { 0.0 };
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        }

        if i + 1 >= period {
            result[i] = Some(rsi_from_averages(avg_gain, avg_loss));
        }
    }

    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn rsi_rising_sequence_is_high() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = compute_rsi(&closes, 10);
        for v in result.iter().skip(9) {
            let v = v.unwrap();
            assert!(v > 90.0 && v <= 100.0, "rsi = {v}");
        }
    }

    #[test]
    fn rsi_falling_sequence_is_low() {
        let closes: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        let result = compute_rsi(&closes, 10);
        for v in result.iter().skip(9) {
            let v = v.unwrap();
            assert!((0.0..10.0).contains(&v), "rsi = {v}");
        }
    }

    #[test]
    fn rsi_warmup_is_absent() {
        let closes = [44.0, 44.34, 44.09, 43.61, 44.33];
        let result = compute_rsi(&closes, 3);
        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert!(result[2].is_some());
    }

    #[test]
    fn rsi_known_value() {
        // period 2, alpha 0.5
        // closes 10, 11, 10
        // t0: g=0 l=0
        // t1: g=0.5 l=0
        // t2: g=0.25 l=0.5 -> rs=0.5 -> rsi = 100 - 100/1.5 = 33.333...
        let result = compute_rsi(&[10.0, 11.0, 10.0], 2);
        assert_approx(result[1].unwrap(), 100.0, 1e-12);
        assert_approx(result[2].unwrap(), 100.0 - 100.0 / 1.5, 1e-12);
    }

    #[test]
    fn rsi_flat_series_guards_division() {
        let result = compute_rsi(&[5.0; 6], 3);
        assert_eq!(result[5], Some(100.0));
    }

    #[test]
    fn rsi_too_few_bars() {
        let result = compute_rsi(&[1.0, 2.0], 10);
        assert!(result.iter().all(|v| v.is_none()));
    }

    #[test]
    fn rsi_name_and_lookback() {
        let rsi = Rsi::new(10);
        assert_eq!(rsi.name(), "rsi10");
        assert_eq!(rsi.lookback(), 9);
    }
}
