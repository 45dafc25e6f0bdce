//! Small aggregate helpers shared by the report builders.
//!
//! Empty input gives 0.0; callers report the sample size next to every figure.

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fraction of strictly positive values; 0.0 for an empty slice.
pub fn win_rate(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| v > 0.0).count() as f64 / values.len() as f64
}
