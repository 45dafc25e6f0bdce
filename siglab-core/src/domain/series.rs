//! Normalized per-ticker bar tables.
//!
//! Both tables are built through constructors that enforce the ordering
//! invariants: daily bars strictly increasing by date, intraday bars grouped
//! by date and ascending by time-of-day within a session. On duplicate keys
//! the first record encountered is kept.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use super::bar::{DailyBar, IntradayBar, Resolution};

/// Daily bars for one ticker, one bar per trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    ticker: String,
    bars: Vec<DailyBar>,
}

impl DailySeries {
    /// Build a series from bars in any order.
    pub fn from_bars(ticker: impl Into<String>, mut bars: Vec<DailyBar>) -> Self {
        // Stable sort so the first record wins on duplicate dates.
        bars.sort_by_key(|b| b.date);
        let mut seen = HashSet::with_capacity(bars.len());
        bars.retain(|b| seen.insert(b.date));
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Index of the bar on exactly `date`.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Close of the most recent bar strictly before `date`.
    pub fn close_before(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.bars.partition_point(|b| b.date < date);
        idx.checked_sub(1).map(|i| self.bars[i].close)
    }
}

/// Intraday bars for one (ticker, resolution), grouped into sessions by date.
#[derive(Debug, Clone, PartialEq)]
pub struct IntradaySeries {
    ticker: String,
    resolution: Resolution,
    sessions: BTreeMap<NaiveDate, Vec<IntradayBar>>,
}

impl IntradaySeries {
    /// Build a table from bars in any order.
    pub fn from_bars(
        ticker: impl Into<String>,
        resolution: Resolution,
        bars: Vec<IntradayBar>,
    ) -> Self {
        let mut sessions: BTreeMap<NaiveDate, Vec<IntradayBar>> = BTreeMap::new();
        for bar in bars {
            sessions.entry(bar.date).or_default().push(bar);
        }
        for session in sessions.values_mut() {
            session.sort_by_key(|b| b.time);
            session.dedup_by_key(|b| b.time);
        }
        Self {
            ticker: ticker.into(),
            resolution,
            sessions,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Bars of the session on `date`, ascending by time-of-day.
    pub fn session(&self, date: NaiveDate) -> Option<&[IntradayBar]> {
        self.sessions.get(&date).map(|v| v.as_slice())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn bar_count(&self) -> usize {
        self.sessions.values().map(|s| s.len()).sum()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.sessions.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.sessions.keys().next_back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn daily(date: &str, close: f64) -> DailyBar {
        DailyBar {
            date: d(date),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: None,
        }
    }

    fn intraday(date: &str, time: &str, close: f64) -> IntradayBar {
        IntradayBar {
            date: d(date),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn daily_sorted_and_deduped_keeping_first() {
        let s = DailySeries::from_bars(
            "SPY",
            vec![
                daily("2024-01-04", 3.0),
                daily("2024-01-02", 1.0),
                daily("2024-01-04", 99.0),
                daily("2024-01-03", 2.0),
            ],
        );
        assert_eq!(s.len(), 3);
        assert_eq!(s.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn close_before_is_strict() {
        let s = DailySeries::from_bars(
            "SPY",
            vec![daily("2024-01-02", 1.0), daily("2024-01-03", 2.0)],
        );
        assert_eq!(s.close_before(d("2024-01-03")), Some(1.0));
        assert_eq!(s.close_before(d("2024-01-05")), Some(2.0));
        assert_eq!(s.close_before(d("2024-01-02")), None);
    }

    #[test]
    fn intraday_groups_and_orders_sessions() {
        let s = IntradaySeries::from_bars(
            "SPY",
            Resolution::FiveMinute,
            vec![
                intraday("2024-01-03", "09:35", 2.0),
                intraday("2024-01-02", "09:30", 1.0),
                intraday("2024-01-03", "09:30", 1.5),
                intraday("2024-01-03", "09:30", 7.0),
            ],
        );
        assert_eq!(s.session_count(), 2);
        assert_eq!(s.bar_count(), 3);
        let session = s.session(d("2024-01-03")).unwrap();
        assert_eq!(session[0].close, 1.5);
        assert_eq!(session[1].close, 2.0);
        assert!(s.session(d("2024-01-04")).is_none());
    }
}
