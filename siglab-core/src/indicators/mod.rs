//! IndicatorEngine — derived daily series.
//!
//! Every indicator is a pure function of a close series and returns a vector
//! index-aligned with its input. Entries inside the warm-up window are `None`
//! (undefined), never zero. Indicators are addressed by string keys such as
//! `rsi10`, `sma200` or `vs_ema20`; [`IndicatorSpec`] parses and names them.

pub mod change;
pub mod ema;
pub mod frame;
pub mod rsi;
pub mod sma;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use change::{compute_pct_above, compute_pct_change, pct_above};
pub use ema::{compute_ema, Ema};
pub use frame::{FrameSet, IndicatorFrame};
pub use rsi::{compute_rsi, Rsi};
pub use sma::{compute_sma, Sma};

/// Trait for single-series indicators over close prices.
pub trait Indicator: Send + Sync {
    /// Key of the produced series (e.g., "rsi10", "sma200").
    fn name(&self) -> &str;

    /// Number of leading entries that are always absent.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire close series.
    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>>;
}

/// A named daily indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndicatorSpec {
    Close,
    Rsi(usize),
    Sma(usize),
    Ema(usize),
    /// Percent change over n days.
    Change(usize),
    /// Percent of close above its n-day SMA.
    AboveSma(usize),
    /// Percent of close above its n-span EMA.
    AboveEma(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown indicator key '{0}'")]
pub struct UnknownIndicator(pub String);

impl IndicatorSpec {
    /// Indicators every frame carries unless configured otherwise.
    pub fn default_set() -> Vec<IndicatorSpec> {
        use IndicatorSpec::*;
        vec![
            Close,
            Rsi(10),
            Rsi(50),
            Sma(50),
            Sma(200),
            Ema(9),
            Ema(20),
            Ema(50),
            Ema(200),
            Change(1),
            Change(5),
            Change(10),
            Change(20),
            AboveSma(50),
            AboveSma(200),
            AboveEma(9),
            AboveEma(20),
        ]
    }

    /// Compute this indicator over a close series.
    pub fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        match *self {
            IndicatorSpec::Close => closes
                .iter()
                .map(|&c| c.is_finite().then_some(c))
                .collect(),
            IndicatorSpec::Rsi(p) => Rsi::new(p).compute(closes),
            IndicatorSpec::Sma(p) => Sma::new(p).compute(closes),
            IndicatorSpec::Ema(s) => Ema::new(s).compute(closes),
            IndicatorSpec::Change(d) => compute_pct_change(closes, d),
            IndicatorSpec::AboveSma(p) => compute_pct_above(closes, &compute_sma(closes, p)),
            IndicatorSpec::AboveEma(s) => compute_pct_above(closes, &compute_ema(closes, s)),
        }
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorSpec::Close => write!(f, "close"),
            IndicatorSpec::Rsi(p) => write!(f, "rsi{p}"),
            IndicatorSpec::Sma(p) => write!(f, "sma{p}"),
            IndicatorSpec::Ema(s) => write!(f, "ema{s}"),
            IndicatorSpec::Change(d) => write!(f, "ret{d}d"),
            IndicatorSpec::AboveSma(p) => write!(f, "vs_sma{p}"),
            IndicatorSpec::AboveEma(s) => write!(f, "vs_ema{s}"),
        }
    }
}

impl FromStr for IndicatorSpec {
    type Err = UnknownIndicator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let unknown = || UnknownIndicator(s.to_string());
        let number = |digits: &str| -> Result<usize, UnknownIndicator> {
            match digits.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(unknown()),
            }
        };

        if key == "close" || key == "price" {
            return Ok(IndicatorSpec::Close);
        }
        if let Some(rest) = key.strip_prefix("vs_sma") {
            return Ok(IndicatorSpec::AboveSma(number(rest)?));
        }
        if let Some(rest) = key.strip_prefix("vs_ema") {
            return Ok(IndicatorSpec::AboveEma(number(rest)?));
        }
        if let Some(rest) = key.strip_prefix("rsi") {
            return Ok(IndicatorSpec::Rsi(number(rest)?));
        }
        if let Some(rest) = key.strip_prefix("sma") {
            return Ok(IndicatorSpec::Sma(number(rest)?));
        }
        if let Some(rest) = key.strip_prefix("ema") {
            return Ok(IndicatorSpec::Ema(number(rest)?));
        }
        if let Some(rest) = key.strip_prefix("ret").and_then(|r| r.strip_suffix('d')) {
            return Ok(IndicatorSpec::Change(number(rest)?));
        }
        Err(unknown())
    }
}

impl TryFrom<String> for IndicatorSpec {
    type Error = UnknownIndicator;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndicatorSpec> for String {
    fn from(spec: IndicatorSpec) -> Self {
        spec.to_string()
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_display() {
        for spec in IndicatorSpec::default_set() {
            let parsed: IndicatorSpec = spec.to_string().parse().unwrap();
            assert_eq!(parsed, spec);
        }
    }

    #[test]
    fn parses_aliases_and_case() {
        assert_eq!("RSI14".parse::<IndicatorSpec>().unwrap(), IndicatorSpec::Rsi(14));
        assert_eq!("price".parse::<IndicatorSpec>().unwrap(), IndicatorSpec::Close);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!("macd".parse::<IndicatorSpec>().is_err());
        assert!("rsi0".parse::<IndicatorSpec>().is_err());
        assert!("retd".parse::<IndicatorSpec>().is_err());
    }

    #[test]
    fn indicator_trait_objects_share_keys() {
        let indicators: Vec<Box<dyn Indicator>> =
            vec![Box::new(Rsi::new(10)), Box::new(Sma::new(50)), Box::new(Ema::new(9))];
        let names: Vec<&str> = indicators.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["rsi10", "sma50", "ema9"]);
    }
}
