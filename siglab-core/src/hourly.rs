//! HourlyProfiler — intraday behaviour bucketed by time-of-day.
//!
//! Bars from every aligned session are grouped by their time-of-day label
//! ("10:30"), not by elapsed time since the open. Returns are expressed from
//! the signal's direction.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::align::AlignedSession;
use crate::domain::clock;
use crate::domain::Direction;
use crate::stats::{mean, win_rate};

/// Aggregates of one time-of-day bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourBucket {
    pub label: String,
    /// Mean of close/open − 1 of the bucket's bars.
    pub mean_return: f64,
    pub win_rate: f64,
    /// Mean of close/session_open − 1, i.e. from the open through this bucket.
    pub mean_cumulative: f64,
    pub mean_volume: f64,
    pub bars: usize,
    pub days: usize,
}

/// First bucket of the session against the average of the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningComparison {
    pub first_label: String,
    pub first_mean: f64,
    /// Mean of the remaining buckets' mean returns; `None` with a single bucket.
    pub rest_mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HourlyProfile {
    /// Buckets in time-of-day order.
    pub buckets: Vec<HourBucket>,
    pub sessions: usize,
}

impl HourlyProfile {
    /// Bucket with the highest mean return (earliest on ties).
    pub fn best(&self) -> Option<&HourBucket> {
        self.buckets.iter().fold(None, |best: Option<&HourBucket>, b| match best {
            Some(cur) if cur.mean_return >= b.mean_return => Some(cur),
            _ => Some(b),
        })
    }

    pub fn opening_comparison(&self) -> Option<OpeningComparison> {
        let (first, rest) = self.buckets.split_first()?;
        let rest_means: Vec<f64> = rest.iter().map(|b| b.mean_return).collect();
        Some(OpeningComparison {
            first_label: first.label.clone(),
            first_mean: first.mean_return,
            rest_mean: (!rest_means.is_empty()).then(|| mean(&rest_means)),
        })
    }

    pub fn bucket(&self, label: &str) -> Option<&HourBucket> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

#[derive(Default)]
struct Acc {
    returns: Vec<f64>,
    cumulative: Vec<f64>,
    volumes: Vec<f64>,
    days: BTreeSet<NaiveDate>,
}

/// Build the profile from aligned sessions.
pub fn profile(sessions: &[AlignedSession<'_>], direction: Direction) -> HourlyProfile {
    let mut acc: BTreeMap<NaiveTime, Acc> = BTreeMap::new();
    for session in sessions {
        let open = session.split.session_open;
        for bar in session.bars {
            if !(bar.open > 0.0 && open > 0.0) {
                continue;
            }
            let slot = acc.entry(bar.time).or_default();
            slot.returns.push(direction.apply(bar.close / bar.open - 1.0));
            slot.cumulative.push(direction.apply(bar.close / open - 1.0));
            slot.volumes.push(bar.volume as f64);
            slot.days.insert(bar.date);
        }
    }

    let buckets = acc
        .into_iter()
        .map(|(time, a)| HourBucket {
            label: clock::label(time),
            mean_return: mean(&a.returns),
            win_rate: win_rate(&a.returns),
            mean_cumulative: mean(&a.cumulative),
            mean_volume: mean(&a.volumes),
            bars: a.returns.len(),
            days: a.days.len(),
        })
        .collect();

    HourlyProfile {
        buckets,
        sessions: sessions.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::SessionSplit;
    use crate::domain::IntradayBar;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    fn hour(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 30, 0).unwrap()
    }

    /// Four hourly bars; each (open, close) given explicitly.
    fn day(d: u32, prices: [(f64, f64); 4], volume: u64) -> Vec<IntradayBar> {
        let date = NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &(o, c))| IntradayBar {
                date,
                time: hour(9 + i as u32),
                open: o,
                high: o.max(c),
                low: o.min(c),
                close: c,
                volume,
            })
            .collect()
    }

    fn aligned(bars: &[IntradayBar]) -> AlignedSession<'_> {
        AlignedSession {
            split: SessionSplit {
                trade_date: bars[0].date,
                prev_close: bars[0].open,
                session_open: bars[0].open,
                session_close: bars[3].close,
            },
            bars,
        }
    }

    #[test]
    fn hand_computed_buckets() {
        let days = vec![
            // returns: +1%, -1%, +2%, 0%
            day(2, [(100.0, 101.0), (100.0, 99.0), (100.0, 102.0), (100.0, 100.0)], 100),
            // returns: +2%, +1%, -2%, +1%
            day(3, [(100.0, 102.0), (100.0, 101.0), (100.0, 98.0), (100.0, 101.0)], 200),
            // returns: -3%, +1%, +2%, -1%
            day(4, [(100.0, 97.0), (100.0, 101.0), (100.0, 102.0), (100.0, 99.0)], 600),
        ];
        let sessions: Vec<AlignedSession<'_>> = days.iter().map(|b| aligned(b)).collect();
        let prof = profile(&sessions, Direction::Long);

        assert_eq!(prof.sessions, 3);
        assert_eq!(prof.buckets.len(), 4);
        let labels: Vec<&str> = prof.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["09:30", "10:30", "11:30", "12:30"]);

        let first = &prof.buckets[0];
        approx(first.mean_return, 0.0); // (1 + 2 - 3) / 3
        approx(first.win_rate, 2.0 / 3.0);
        approx(first.mean_volume, 300.0);
        assert_eq!(first.days, 3);

        let second = &prof.buckets[1];
        approx(second.mean_return, (-0.01 + 0.01 + 0.01) / 3.0);
        approx(second.win_rate, 2.0 / 3.0);

        let third = &prof.buckets[2];
        approx(third.mean_return, (0.02 - 0.02 + 0.02) / 3.0);
        approx(third.win_rate, 2.0 / 3.0);
        // cumulative from each session's open (100): 102, 98, 102
        approx(third.mean_cumulative, (0.02 - 0.02 + 0.02) / 3.0);

        let fourth = &prof.buckets[3];
        approx(fourth.mean_return, 0.0);
        approx(fourth.win_rate, 1.0 / 3.0);

        let best = prof.best().unwrap();
        assert_eq!(best.label, "11:30");

        let cmp = prof.opening_comparison().unwrap();
        assert_eq!(cmp.first_label, "09:30");
        approx(cmp.first_mean, 0.0);
        let rest = (second.mean_return + third.mean_return + fourth.mean_return) / 3.0;
        approx(cmp.rest_mean.unwrap(), rest);
    }

    #[test]
    fn short_direction_flips_bucket_returns() {
        let days = vec![day(2, [(100.0, 101.0), (100.0, 99.0), (100.0, 102.0), (100.0, 100.0)], 1)];
        let sessions: Vec<AlignedSession<'_>> = days.iter().map(|b| aligned(b)).collect();
        let prof = profile(&sessions, Direction::Short);
        approx(prof.bucket("09:30").unwrap().mean_return, -0.01);
        approx(prof.bucket("10:30").unwrap().win_rate, 1.0);
    }

    #[test]
    fn empty_profile() {
        let prof = profile(&[], Direction::Long);
        assert!(prof.buckets.is_empty());
        assert!(prof.best().is_none());
        assert!(prof.opening_comparison().is_none());
    }
}
