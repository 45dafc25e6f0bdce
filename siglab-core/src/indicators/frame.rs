//! Per-ticker indicator frames.
//!
//! A frame is computed once from a [`DailySeries`] and queried by date or bar
//! index afterwards. All series in a frame share the daily table's date index.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::{Indicator, IndicatorSpec};
use crate::domain::DailySeries;

/// Precomputed indicator series for one ticker.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    ticker: String,
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
    series: HashMap<String, Vec<Option<f64>>>,
}

impl IndicatorFrame {
    /// Compute every requested indicator over the series' closes.
    pub fn compute(daily: &DailySeries, specs: &[IndicatorSpec]) -> Self {
        let mut frame = Self {
            ticker: daily.ticker().to_string(),
            dates: daily.dates(),
            closes: daily.closes(),
            series: HashMap::with_capacity(specs.len()),
        };
        for spec in specs {
            let key = spec.to_string();
            if !frame.series.contains_key(&key) {
                let values = spec.compute(&frame.closes);
                frame.series.insert(key, values);
            }
        }
        frame
    }

    /// Add a custom indicator series under the indicator's own name.
    pub fn add(&mut self, indicator: &dyn Indicator) {
        let values = indicator.compute(&self.closes);
        self.series.insert(indicator.name().to_string(), values);
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.series.contains_key(key)
    }

    /// Keys of all stored series, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.series.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Value of `key` at bar index `idx`; `None` if unknown key, out of range or warm-up.
    pub fn value(&self, key: &str, idx: usize) -> Option<f64> {
        self.series.get(key).and_then(|v| v.get(idx).copied().flatten())
    }

    /// Value of `key` on the last bar.
    pub fn latest(&self, key: &str) -> Option<f64> {
        self.len().checked_sub(1).and_then(|i| self.value(key, i))
    }

    /// Value of `key` on the bar `back` positions before the last one.
    pub fn latest_back(&self, key: &str, back: usize) -> Option<f64> {
        self.len()
            .checked_sub(1 + back)
            .and_then(|i| self.value(key, i))
    }

    pub fn series(&self, key: &str) -> Option<&[Option<f64>]> {
        self.series.get(key).map(|v| v.as_slice())
    }
}

/// Frames for a set of tickers, keyed by ticker.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    frames: BTreeMap<String, IndicatorFrame>,
}

impl FrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute frames for each daily series.
    pub fn compute<'a>(
        dailies: impl IntoIterator<Item = &'a DailySeries>,
        specs: &[IndicatorSpec],
    ) -> Self {
        let mut set = Self::new();
        for daily in dailies {
            set.insert(IndicatorFrame::compute(daily, specs));
        }
        set
    }

    pub fn insert(&mut self, frame: IndicatorFrame) {
        self.frames.insert(frame.ticker().to_string(), frame);
    }

    pub fn get(&self, ticker: &str) -> Option<&IndicatorFrame> {
        self.frames.get(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorFrame> {
        self.frames.values()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
