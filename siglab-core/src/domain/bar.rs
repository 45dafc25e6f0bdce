//! Bars — the fundamental market data units.
//!
//! Two resolutions of the same instrument are kept as independent tables:
//! daily bars (one per trading day) and intraday bars (grouped into sessions).

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Daily OHLC bar for a single ticker on a single trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
}

impl DailyBar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Intraday OHLCV bar. `time` is the bar's start time-of-day (exchange local).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayBar {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Fixed bar width of an intraday table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "5min")]
    FiveMinute,
    #[serde(rename = "60min")]
    SixtyMinute,
}

impl Resolution {
    pub const ALL: [Resolution; 2] = [Resolution::FiveMinute, Resolution::SixtyMinute];

    pub fn minutes(self) -> u32 {
        match self {
            Resolution::FiveMinute => 5,
            Resolution::SixtyMinute => 60,
        }
    }

    /// Label used in config and reports ("5min", "60min").
    pub fn label(self) -> &'static str {
        match self {
            Resolution::FiveMinute => "5min",
            Resolution::SixtyMinute => "60min",
        }
    }

    /// Suffix of the on-disk table name ("5m", "60m").
    pub fn file_suffix(self) -> &'static str {
        match self {
            Resolution::FiveMinute => "5m",
            Resolution::SixtyMinute => "60m",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
