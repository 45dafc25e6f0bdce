//! GapClassifier — categorizes trade dates by gap and follow-through.
//!
//! Classification uses raw price returns (sign of overnight, sign of
//! intraday); the per-category means are reported from the signal's
//! direction. A zero overnight return is bucketed with "up" by default, which
//! is a convention and can be switched with [`ZeroGapPolicy`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::returns::Decomposition;
use crate::stats::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GapPattern {
    GapDownReverseUp,
    GapDownContinueDown,
    GapUpContinueUp,
    GapUpReverseDown,
}

impl GapPattern {
    pub const ALL: [GapPattern; 4] = [
        GapPattern::GapDownReverseUp,
        GapPattern::GapDownContinueDown,
        GapPattern::GapUpContinueUp,
        GapPattern::GapUpReverseDown,
    ];

    /// The setup a signal of this direction is looking for.
    pub fn primary_setup(direction: Direction) -> GapPattern {
        match direction {
            Direction::Long => GapPattern::GapDownReverseUp,
            Direction::Short => GapPattern::GapUpReverseDown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GapPattern::GapDownReverseUp => "gap down, reverse up",
            GapPattern::GapDownContinueDown => "gap down, continue down",
            GapPattern::GapUpContinueUp => "gap up, continue up",
            GapPattern::GapUpReverseDown => "gap up, reverse down",
        }
    }
}

impl fmt::Display for GapPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side a zero overnight return falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroGapPolicy {
    #[default]
    Up,
    Down,
}

/// Classify by the signs of the raw overnight and intraday returns.
///
/// A zero intraday return counts as "down" (not a reversal up / continuation up).
pub fn classify(overnight: f64, intraday: f64, zero_gap: ZeroGapPolicy) -> GapPattern {
    let gap_down = match zero_gap {
        ZeroGapPolicy::Up => overnight < 0.0,
        ZeroGapPolicy::Down => overnight <= 0.0,
    };
    let rose = intraday > 0.0;
    match (gap_down, rose) {
        (true, true) => GapPattern::GapDownReverseUp,
        (true, false) => GapPattern::GapDownContinueDown,
        (false, true) => GapPattern::GapUpContinueUp,
        (false, false) => GapPattern::GapUpReverseDown,
    }
}

/// Frequency and mean returns of one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStats {
    pub pattern: GapPattern,
    pub count: usize,
    /// Fraction of all classified dates.
    pub frequency: f64,
    pub mean_overnight: f64,
    pub mean_intraday: f64,
    pub mean_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSummary {
    pub total: usize,
    pub primary_setup: GapPattern,
    /// One entry per pattern, in [`GapPattern::ALL`] order.
    pub patterns: Vec<PatternStats>,
}

impl GapSummary {
    /// Summarize raw decompositions for a signal of `direction`.
    pub fn compute(raw: &[Decomposition], direction: Direction, zero_gap: ZeroGapPolicy) -> Self {
        let patterns = GapPattern::ALL
            .iter()
            .map(|&pattern| {
                let rows: Vec<Decomposition> = raw
                    .iter()
                    .filter(|d| classify(d.overnight, d.intraday, zero_gap) == pattern)
                    .map(|d| d.directed(direction))
                    .collect();
                let frequency = if raw.is_empty() {
                    0.0
                } else {
                    rows.len() as f64 / raw.len() as f64
                };
                PatternStats {
                    pattern,
                    count: rows.len(),
                    frequency,
                    mean_overnight: mean(&rows.iter().map(|d| d.overnight).collect::<Vec<_>>()),
                    mean_intraday: mean(&rows.iter().map(|d| d.intraday).collect::<Vec<_>>()),
                    mean_total: mean(&rows.iter().map(|d| d.total).collect::<Vec<_>>()),
                }
            })
            .collect();
        Self {
            total: raw.len(),
            primary_setup: GapPattern::primary_setup(direction),
            patterns,
        }
    }

    pub fn stats(&self, pattern: GapPattern) -> Option<&PatternStats> {
        self.patterns.iter().find(|p| p.pattern == pattern)
    }

    pub fn primary(&self) -> Option<&PatternStats> {
        self.stats(self.primary_setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn classification_signs() {
        let p = ZeroGapPolicy::Up;
        assert_eq!(classify(-0.015, 0.02, p), GapPattern::GapDownReverseUp);
        assert_eq!(classify(-0.015, -0.01, p), GapPattern::GapDownContinueDown);
        assert_eq!(classify(0.01, 0.01, p), GapPattern::GapUpContinueUp);
        assert_eq!(classify(0.01, -0.01, p), GapPattern::GapUpReverseDown);
    }

    #[test]
    fn zero_gap_boundary() {
        assert_eq!(classify(0.0, -0.005, ZeroGapPolicy::Up), GapPattern::GapUpReverseDown);
        assert_eq!(classify(0.0, -0.005, ZeroGapPolicy::Down), GapPattern::GapDownContinueDown);
        assert_eq!(classify(-0.01, 0.0, ZeroGapPolicy::Up), GapPattern::GapDownContinueDown);
    }

    #[test]
    fn primary_setup_by_direction() {
        assert_eq!(GapPattern::primary_setup(Direction::Long), GapPattern::GapDownReverseUp);
        assert_eq!(GapPattern::primary_setup(Direction::Short), GapPattern::GapUpReverseDown);
    }

    #[test]
    fn summary_frequencies_and_directed_means() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let mk = |o: f64, i: f64| Decomposition {
            trade_date: date,
            overnight: o,
            intraday: i,
            total: (1.0 + o) * (1.0 + i) - 1.0,
        };
        let raw = vec![mk(0.01, -0.02), mk(0.02, -0.01), mk(-0.01, 0.01), mk(0.01, 0.01)];
        let sum = GapSummary::compute(&raw, Direction::Short, ZeroGapPolicy::Up);
        assert_eq!(sum.total, 4);
        assert_eq!(sum.primary_setup, GapPattern::GapUpReverseDown);
        let primary = sum.primary().unwrap();
        assert_eq!(primary.count, 2);
        assert!((primary.frequency - 0.5).abs() < 1e-12);
        // Short view negates: mean intraday of -0.02, -0.01 -> +0.015.
        assert!((primary.mean_intraday - 0.015).abs() < 1e-12);
        let counts: usize = sum.patterns.iter().map(|p| p.count).sum();
        assert_eq!(counts, 4);
    }
}
