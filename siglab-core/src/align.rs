//! IntradayAligner — joins trade dates to the traded instrument's sessions.
//!
//! For each trade date:
//! - the session is the intraday bars on exactly that date, restricted to the
//!   regular session window when one is configured
//! - the session is usable only with at least `min_session_bars` bars
//! - `session_open` is the open of the earliest bar
//! - `session_close` is the close of the last bar at or after `close_cutoff`,
//!   or of the session's final bar when no bar reaches the cutoff
//! - `prev_close` is the daily close strictly before the trade date, taken
//!   from the daily table, not the intraday one
//!
//! Skipped dates are kept with a reason so callers can report them.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::clock::hhmm;
use crate::domain::{DailySeries, IntradayBar, IntradaySeries, Resolution};

/// Session alignment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub min_session_bars: usize,
    /// Bars before this time-of-day are excluded (pre-market).
    #[serde(with = "hhmm::option")]
    pub session_start: Option<NaiveTime>,
    /// Bars at or after this time-of-day are excluded (after-hours).
    #[serde(with = "hhmm::option")]
    pub session_end: Option<NaiveTime>,
    #[serde(with = "hhmm")]
    pub close_cutoff: NaiveTime,
}

impl AlignConfig {
    /// Defaults for a table resolution: the cutoff is the start of the last regular bar.
    pub fn for_resolution(resolution: Resolution) -> Self {
        let close_cutoff = match resolution {
            Resolution::FiveMinute => NaiveTime::from_hms_opt(15, 55, 0),
            Resolution::SixtyMinute => NaiveTime::from_hms_opt(15, 0, 0),
        }
        .unwrap_or(NaiveTime::MIN);
        Self {
            min_session_bars: 4,
            session_start: NaiveTime::from_hms_opt(9, 30, 0),
            session_end: NaiveTime::from_hms_opt(16, 0, 0),
            close_cutoff,
        }
    }

    /// Regular-session slice of a full session (bars are time-ordered).
    pub fn regular<'a>(&self, bars: &'a [IntradayBar]) -> &'a [IntradayBar] {
        let lo = match self.session_start {
            Some(start) => bars.partition_point(|b| b.time < start),
            None => 0,
        };
        let hi = match self.session_end {
            Some(end) => bars.partition_point(|b| b.time < end),
            None => bars.len(),
        };
        if lo >= hi {
            &[]
        } else {
            &bars[lo..hi]
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self::for_resolution(Resolution::FiveMinute)
    }
}

/// Prices joined across the daily and intraday tables for one trade date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSplit {
    pub trade_date: NaiveDate,
    pub prev_close: f64,
    pub session_open: f64,
    pub session_close: f64,
}

/// A usable session: its split plus the regular-session bars.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSession<'a> {
    pub split: SessionSplit,
    pub bars: &'a [IntradayBar],
}

/// Why a trade date was left out of intraday analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    NoSession,
    TooFewBars { count: usize },
    NoPriorClose,
    InvalidPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedDate {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Output of aligning a batch of trade dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment<'a> {
    pub sessions: Vec<AlignedSession<'a>>,
    pub dropped: Vec<DroppedDate>,
}

impl Alignment<'_> {
    pub fn splits(&self) -> Vec<SessionSplit> {
        self.sessions.iter().map(|s| s.split).collect()
    }
}

/// Joins trade dates to intraday sessions.
#[derive(Debug, Clone, Default)]
pub struct IntradayAligner {
    config: AlignConfig,
}

impl IntradayAligner {
    pub fn new(config: AlignConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Align one trade date.
    pub fn align_date<'a>(
        &self,
        date: NaiveDate,
        daily: &DailySeries,
        intraday: &'a IntradaySeries,
    ) -> Result<AlignedSession<'a>, DropReason> {
        let full = intraday.session(date).ok_or(DropReason::NoSession)?;
        let bars = self.config.regular(full);
        if bars.is_empty() {
            return Err(DropReason::NoSession);
        }
        if bars.len() < self.config.min_session_bars {
            return Err(DropReason::TooFewBars { count: bars.len() });
        }
        let prev_close = daily.close_before(date).ok_or(DropReason::NoPriorClose)?;

        let session_open = bars[0].open;
        let close_bar = bars
            .iter()
            .rev()
            .find(|b| b.time >= self.config.close_cutoff)
            .or_else(|| bars.last())
            .ok_or(DropReason::NoSession)?;
        let session_close = close_bar.close;

        let valid = |p: f64| p.is_finite() && p > 0.0;
        if !(valid(prev_close) && valid(session_open) && valid(session_close)) {
            return Err(DropReason::InvalidPrice);
        }

        Ok(AlignedSession {
            split: SessionSplit {
                trade_date: date,
                prev_close,
                session_open,
                session_close,
            },
            bars,
        })
    }

    /// Align every trade date, recording skipped ones.
    pub fn align<'a>(
        &self,
        trade_dates: &[NaiveDate],
        daily: &DailySeries,
        intraday: &'a IntradaySeries,
    ) -> Alignment<'a> {
        let mut out = Alignment::default();
        for &date in trade_dates {
            match self.align_date(date, daily, intraday) {
                Ok(session) => out.sessions.push(session),
                Err(reason) => {
                    debug!(%date, ?reason, ticker = intraday.ticker(), "dropping trade date");
                    out.dropped.push(DroppedDate { date, reason });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyBar;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn bar(day: u32, time: NaiveTime, open: f64, close: f64) -> IntradayBar {
        IntradayBar {
            date: d(day),
            time,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1_000,
        }
    }

    fn daily() -> DailySeries {
        let bars = [(2, 100.0), (3, 101.0), (4, 102.0)]
            .iter()
            .map(|&(day, c)| DailyBar {
                date: d(day),
                open: c,
                high: c,
                low: c,
                close: c,
                adj_close: None,
            })
            .collect();
        DailySeries::from_bars("SPY", bars)
    }

    fn session(day: u32) -> Vec<IntradayBar> {
        vec![
            bar(day, t(8, 0), 90.0, 91.0), // pre-market
            bar(day, t(9, 30), 98.0, 99.0),
            bar(day, t(9, 35), 99.0, 100.0),
            bar(day, t(12, 0), 100.0, 101.0),
            bar(day, t(15, 55), 101.0, 102.0),
            bar(day, t(16, 30), 102.0, 110.0), // after-hours
        ]
    }

    #[test]
    fn split_uses_daily_prev_close_and_cutoff_bar() {
        let intraday = IntradaySeries::from_bars("SPY", Resolution::FiveMinute, session(3));
        let aligner = IntradayAligner::default();
        let s = aligner.align_date(d(3), &daily(), &intraday).unwrap();
        assert_eq!(s.split.prev_close, 100.0);
        assert_eq!(s.split.session_open, 98.0);
        assert_eq!(s.split.session_close, 102.0);
        assert_eq!(s.bars.len(), 4);
    }

    #[test]
    fn close_falls_back_to_final_bar_without_cutoff_bar() {
        let mut bars = session(3);
        bars.retain(|b| b.time < t(15, 0));
        bars.push(bar(3, t(14, 0), 100.0, 100.5));
        let intraday = IntradaySeries::from_bars("SPY", Resolution::FiveMinute, bars);
        let s = IntradayAligner::default()
            .align_date(d(3), &daily(), &intraday)
            .unwrap();
        assert_eq!(s.split.session_close, 100.5);
    }

    #[test]
    fn short_and_missing_sessions_are_dropped() {
        let mut bars = session(3);
        bars.truncate(3); // 08:00, 09:30, 09:35 -> two regular bars
        let intraday = IntradaySeries::from_bars("SPY", Resolution::FiveMinute, bars);
        let aligned = IntradayAligner::default().align(&[d(3), d(4)], &daily(), &intraday);
        assert!(aligned.sessions.is_empty());
        assert_eq!(
            aligned.dropped,
            vec![
                DroppedDate {
                    date: d(3),
                    reason: DropReason::TooFewBars { count: 2 }
                },
                DroppedDate {
                    date: d(4),
                    reason: DropReason::NoSession
                },
            ]
        );
    }

    #[test]
    fn first_daily_date_has_no_prior_close() {
        let intraday = IntradaySeries::from_bars("SPY", Resolution::FiveMinute, session(2));
        let err = IntradayAligner::default()
            .align_date(d(2), &daily(), &intraday)
            .unwrap_err();
        assert_eq!(err, DropReason::NoPriorClose);
    }

    #[test]
    fn unbounded_window_keeps_extended_hours() {
        let config = AlignConfig {
            session_start: None,
            session_end: None,
            ..AlignConfig::default()
        };
        let intraday = IntradaySeries::from_bars("SPY", Resolution::FiveMinute, session(3));
        let s = IntradayAligner::new(config)
            .align_date(d(3), &daily(), &intraday)
            .unwrap();
        assert_eq!(s.split.session_open, 90.0);
        assert_eq!(s.split.session_close, 110.0);
    }
}
