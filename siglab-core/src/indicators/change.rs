//! Derived percentage series: n-day returns and distance from a moving average.

/// Percent change over `days` bars: (close[t] / close[t-days] - 1) * 100.
pub fn compute_pct_change(closes: &[f64], days: usize) -> Vec<Option<f64>> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let base = *closes.get(i.checked_sub(days)?)?;
            if days == 0 || base <= 0.0 || !base.is_finite() || !c.is_finite() {
                return None;
            }
            Some((c / base - 1.0) * 100.0)
        })
        .collect()
}

/// Percent of `value` above `reference`. Absent when the reference is absent or not positive.
pub fn pct_above(value: f64, reference: Option<f64>) -> Option<f64> {
    match reference {
        Some(r) if r > 0.0 && value.is_finite() => Some((value / r - 1.0) * 100.0),
        _ => None,
    }
}

/// Element-wise [`pct_above`] of a close series over a reference series.
pub fn compute_pct_above(closes: &[f64], reference: &[Option<f64>]) -> Vec<Option<f64>> {
    closes
        .iter()
        .zip(reference)
        .map(|(&c, &r)| pct_above(c, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn pct_change_basic() {
        let result = compute_pct_change(&[100.0, 110.0, 99.0], 1);
        assert!(result[0].is_none());
        assert_approx(result[1].unwrap(), 10.0, 1e-9);
        assert_approx(result[2].unwrap(), -10.0, 1e-9);
    }

    #[test]
    fn pct_above_guards_zero_reference() {
        assert_eq!(pct_above(10.0, Some(0.0)), None);
        assert_eq!(pct_above(10.0, None), None);
        assert_approx(pct_above(13.0, Some(10.0)).unwrap(), 30.0, 1e-9);
    }
}
