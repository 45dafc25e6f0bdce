//! EntryTimingOptimizer — compares entry times within the trade-date session.
//!
//! For each candidate time-of-day, entry is the open of the first bar at or
//! after it and exit is the session close of the aligned split. Per-date
//! returns are direction-adjusted. Candidates with fewer than `min_samples`
//! dates are not ranked.

use std::cmp::Ordering;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::align::AlignedSession;
use crate::domain::clock::{self, hhmm};
use crate::domain::Direction;
use crate::stats::{mean, win_rate};

/// A candidate entry time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCandidate {
    pub label: String,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

impl EntryCandidate {
    /// Candidate `minutes` after the open, labelled "open" or "+Nm".
    pub fn after_open(open: NaiveTime, minutes: u32) -> Self {
        let label = if minutes == 0 {
            "open".to_string()
        } else {
            format!("+{minutes}m")
        };
        Self {
            label,
            time: clock::add_minutes(open, minutes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    #[serde(with = "hhmm")]
    pub market_open: NaiveTime,
    /// Minutes after the open, in catalog order.
    pub offsets_minutes: Vec<u32>,
    pub min_samples: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            market_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            offsets_minutes: vec![0, 5, 10, 15, 20, 25, 30, 45, 60, 90],
            min_samples: 3,
        }
    }
}

impl TimingConfig {
    pub fn candidates(&self) -> Vec<EntryCandidate> {
        self.offsets_minutes
            .iter()
            .map(|&m| EntryCandidate::after_open(self.market_open, m))
            .collect()
    }
}

/// Statistics of one candidate entry time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingResult {
    pub label: String,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub samples: usize,
    pub mean_return: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimingReport {
    /// Candidates with enough samples, best mean return first.
    pub ranked: Vec<TimingResult>,
    /// Labels of candidates below the minimum sample size.
    pub insufficient: Vec<String>,
}

impl TimingReport {
    pub fn optimal(&self) -> Option<&TimingResult> {
        self.ranked.first()
    }
}

/// Entry price for a candidate time: open of the first bar at or after it.
fn entry_price(session: &AlignedSession<'_>, time: NaiveTime) -> Option<f64> {
    let idx = session.bars.partition_point(|b| b.time < time);
    session
        .bars
        .get(idx)
        .map(|b| b.open)
        .filter(|p| p.is_finite() && *p > 0.0)
}

pub struct EntryTimingOptimizer {
    config: TimingConfig,
}

impl EntryTimingOptimizer {
    pub fn new(config: TimingConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, sessions: &[AlignedSession<'_>], direction: Direction) -> TimingReport {
        let mut report = TimingReport::default();
        for candidate in self.config.candidates() {
            let returns: Vec<f64> = sessions
                .iter()
                .filter_map(|s| {
                    let entry = entry_price(s, candidate.time)?;
                    Some(direction.apply(s.split.session_close / entry - 1.0))
                })
                .collect();
            if returns.len() < self.config.min_samples {
                report.insufficient.push(candidate.label);
                continue;
            }
            report.ranked.push(TimingResult {
                label: candidate.label,
                time: candidate.time,
                samples: returns.len(),
                mean_return: mean(&returns),
                win_rate: win_rate(&returns),
            });
        }
        // Stable: ties keep catalog order.
        report.ranked.sort_by(|a, b| {
            b.mean_return
                .partial_cmp(&a.mean_return)
                .unwrap_or(Ordering::Equal)
        });
        report
    }
}
