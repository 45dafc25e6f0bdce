//! Bar stores — locate and parse daily and intraday tables.
//!
//! Layout:
//! - daily: `{daily_dir}/{FILE}.csv`, else `{daily_dir}/{FILE}2.csv`
//!   (longer-history variant)
//! - intraday: `{intraday_dir}/{FILE}_{5m|60m}.csv`
//!
//! `FILE` is the ticker after the filename alias map. A missing or unreadable
//! table is "no data": the store logs it and returns `None`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use siglab_core::domain::clock::parse_time_of_day;
use siglab_core::domain::{DailyBar, DailySeries, IntradayBar, IntradaySeries, Resolution};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DataConfig;

/// Source of daily bar tables.
pub trait DailyBarStore: Send + Sync {
    fn load_daily(&self, ticker: &str) -> Option<DailySeries>;
}

/// Source of intraday bar tables.
pub trait IntradayBarStore: Send + Sync {
    fn load_intraday(&self, ticker: &str, resolution: Resolution) -> Option<IntradaySeries>;
}

/// Errors reading a table that exists on disk.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{path}': missing column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("'{path}': no usable rows")]
    Empty { path: PathBuf },
}

// ── Header handling ──────────────────────────────────────────────────

struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (normalize_header(h), i))
                .collect(),
        )
    }

    /// First alias present in the header.
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.0.get(*a).copied())
    }

    fn require(&self, path: &Path, column: &'static str, aliases: &[&str]) -> Result<usize, StoreError> {
        self.find(aliases).ok_or_else(|| StoreError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

const DATE: &[&str] = &["date", "day"];
const DATETIME: &[&str] = &["datetime", "timestamp", "date_time"];
const TIME: &[&str] = &["time"];
const OPEN: &[&str] = &["open", "o"];
const HIGH: &[&str] = &["high", "h"];
const LOW: &[&str] = &["low", "l"];
const CLOSE: &[&str] = &["close", "c"];
const ADJ_CLOSE: &[&str] = &["adj_close", "adjclose", "adjusted_close"];
const VOLUME: &[&str] = &["volume", "v", "vol"];

// ── Field parsing ────────────────────────────────────────────────────

/// Leading `YYYY-MM-DD` of a date or datetime field.
fn parse_date(field: &str) -> Option<NaiveDate> {
    let s = field.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Date and time-of-day of a datetime field such as `2024-01-02 09:30:00-05:00`.
fn parse_datetime(field: &str) -> Option<(NaiveDate, NaiveTime)> {
    let s = field.trim();
    let date = parse_date(s)?;
    let rest = s.get(11..)?;
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ':'))
        .unwrap_or(rest.len());
    Some((date, parse_time_of_day(&rest[..end])?))
}

fn parse_price(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    let v: f64 = record.get(idx)?.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

fn parse_volume(record: &csv::StringRecord, idx: usize) -> u64 {
    record
        .get(idx)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(0)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, StoreError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Parse a daily CSV. Rows whose date or OHLC fields do not parse, or that
/// fail [`DailyBar::is_sane`], are skipped.
pub fn read_daily_csv(path: &Path, ticker: &str) -> Result<DailySeries, StoreError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let cols = Columns::new(&headers);
    let date = cols
        .find(DATE)
        .or_else(|| cols.find(DATETIME))
        .ok_or_else(|| StoreError::MissingColumn {
            path: path.to_path_buf(),
            column: "date",
        })?;
    let open = cols.require(path, "open", OPEN)?;
    let high = cols.require(path, "high", HIGH)?;
    let low = cols.require(path, "low", LOW)?;
    let close = cols.require(path, "close", CLOSE)?;
    let adj_close = cols.find(ADJ_CLOSE);

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let bar = (|| {
            Some(DailyBar {
                date: parse_date(record.get(date)?)?,
                open: parse_price(&record, open)?,
                high: parse_price(&record, high)?,
                low: parse_price(&record, low)?,
                close: parse_price(&record, close)?,
                adj_close: adj_close.and_then(|i| parse_price(&record, i)),
            })
        })();
        match bar {
            Some(bar) if bar.is_sane() => bars.push(bar),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "skipped unparsable or inconsistent daily rows");
    }
    if bars.is_empty() {
        return Err(StoreError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(DailySeries::from_bars(ticker, bars))
}

/// Parse an intraday CSV with either `date` + `time` or a single `datetime` column.
pub fn read_intraday_csv(
    path: &Path,
    ticker: &str,
    resolution: Resolution,
) -> Result<IntradaySeries, StoreError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let cols = Columns::new(&headers);
    let date_col = cols.find(DATE);
    let time_col = cols.find(TIME);
    let datetime_col = cols.find(DATETIME);
    if datetime_col.is_none() && (date_col.is_none() || time_col.is_none()) {
        return Err(StoreError::MissingColumn {
            path: path.to_path_buf(),
            column: "datetime",
        });
    }
    let open = cols.require(path, "open", OPEN)?;
    let high = cols.require(path, "high", HIGH)?;
    let low = cols.require(path, "low", LOW)?;
    let close = cols.require(path, "close", CLOSE)?;
    let volume = cols.find(VOLUME);

    let stamp = |record: &csv::StringRecord| -> Option<(NaiveDate, NaiveTime)> {
        if let (Some(d), Some(t)) = (date_col, time_col) {
            let date = parse_date(record.get(d)?);
            let time = parse_time_of_day(record.get(t)?);
            if let (Some(date), Some(time)) = (date, time) {
                return Some((date, time));
            }
        }
        parse_datetime(record.get(datetime_col?)?)
    };

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let bar = (|| {
            let (date, time) = stamp(&record)?;
            Some(IntradayBar {
                date,
                time,
                open: parse_price(&record, open)?,
                high: parse_price(&record, high)?,
                low: parse_price(&record, low)?,
                close: parse_price(&record, close)?,
                volume: volume.map(|i| parse_volume(&record, i)).unwrap_or(0),
            })
        })();
        match bar {
            Some(bar) => bars.push(bar),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "skipped unparsable intraday rows");
    }
    if bars.is_empty() {
        return Err(StoreError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(IntradaySeries::from_bars(ticker, resolution, bars))
}

// ── CSV store ────────────────────────────────────────────────────────

/// Bar tables stored as CSV files on disk.
#[derive(Debug, Clone)]
pub struct CsvStore {
    daily_dir: PathBuf,
    intraday_dir: PathBuf,
    aliases: BTreeMap<String, String>,
}

impl CsvStore {
    pub fn new(daily_dir: impl Into<PathBuf>, intraday_dir: impl Into<PathBuf>) -> Self {
        Self {
            daily_dir: daily_dir.into(),
            intraday_dir: intraday_dir.into(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self {
            daily_dir: config.daily_dir.clone(),
            intraday_dir: config.intraday_dir.clone(),
            aliases: config.filename_aliases.clone(),
        }
    }

    pub fn with_alias(mut self, ticker: impl Into<String>, file_stem: impl Into<String>) -> Self {
        self.aliases.insert(ticker.into(), file_stem.into());
        self
    }

    fn file_stem<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.aliases.get(ticker).map(String::as_str).unwrap_or(ticker)
    }

    /// Candidate daily files, in lookup order.
    pub fn daily_paths(&self, ticker: &str) -> [PathBuf; 2] {
        let stem = self.file_stem(ticker);
        [
            self.daily_dir.join(format!("{stem}.csv")),
            self.daily_dir.join(format!("{stem}2.csv")),
        ]
    }

    pub fn intraday_path(&self, ticker: &str, resolution: Resolution) -> PathBuf {
        let stem = self.file_stem(ticker);
        self.intraday_dir
            .join(format!("{stem}_{}.csv", resolution.file_suffix()))
    }
}

impl DailyBarStore for CsvStore {
    fn load_daily(&self, ticker: &str) -> Option<DailySeries> {
        let Some(path) = self.daily_paths(ticker).into_iter().find(|p| p.exists()) else {
            debug!(ticker, dir = %self.daily_dir.display(), "no daily table");
            return None;
        };
        match read_daily_csv(&path, ticker) {
            Ok(series) => Some(series),
            Err(e) => {
                warn!(ticker, error = %e, "unreadable daily table, treating as no data");
                None
            }
        }
    }
}

impl IntradayBarStore for CsvStore {
    fn load_intraday(&self, ticker: &str, resolution: Resolution) -> Option<IntradaySeries> {
        let path = self.intraday_path(ticker, resolution);
        if !path.exists() {
            debug!(ticker, %resolution, path = %path.display(), "no intraday table");
            return None;
        }
        match read_intraday_csv(&path, ticker, resolution) {
            Ok(series) => Some(series),
            Err(e) => {
                warn!(ticker, %resolution, error = %e, "unreadable intraday table, treating as no data");
                None
            }
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────

/// Tables held in memory, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    daily: HashMap<String, DailySeries>,
    intraday: HashMap<(String, Resolution), IntradaySeries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_daily(&mut self, series: DailySeries) {
        self.daily.insert(series.ticker().to_string(), series);
    }

    pub fn insert_intraday(&mut self, series: IntradaySeries) {
        self.intraday
            .insert((series.ticker().to_string(), series.resolution()), series);
    }

    pub fn with_daily(mut self, series: DailySeries) -> Self {
        self.insert_daily(series);
        self
    }

    pub fn with_intraday(mut self, series: IntradaySeries) -> Self {
        self.insert_intraday(series);
        self
    }
}

impl DailyBarStore for MemoryStore {
    fn load_daily(&self, ticker: &str) -> Option<DailySeries> {
        self.daily.get(ticker).cloned()
    }
}

impl IntradayBarStore for MemoryStore {
    fn load_intraday(&self, ticker: &str, resolution: Resolution) -> Option<IntradaySeries> {
        self.intraday
            .get(&(ticker.to_string(), resolution))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_with_offset() {
        let (d, t) = parse_datetime("2024-01-02 09:30:00-05:00").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(t, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        let (_, t) = parse_datetime("2024-01-02T15:55").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(15, 55, 0).unwrap());
        assert!(parse_datetime("2024-01-02").is_none());
    }

    #[test]
    fn header_aliases_are_case_insensitive() {
        let headers = csv::StringRecord::from(vec!["Date", "Open", "High", "Low", "Close", "Adj Close"]);
        let cols = Columns::new(&headers);
        assert_eq!(cols.find(DATE), Some(0));
        assert_eq!(cols.find(ADJ_CLOSE), Some(5));
    }

    #[test]
    fn aliases_map_file_stems() {
        let store = CsvStore::new("d", "i").with_alias("BTC-USD", "BTCUSD");
        assert_eq!(store.daily_paths("BTC-USD")[0], PathBuf::from("d/BTCUSD.csv"));
        assert_eq!(store.daily_paths("SPY")[1], PathBuf::from("d/SPY2.csv"));
        assert_eq!(
            store.intraday_path("SPY", Resolution::SixtyMinute),
            PathBuf::from("i/SPY_60m.csv")
        );
    }

    #[test]
    fn memory_store_keys_by_resolution() {
        let bars = vec![IntradayBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
        }];
        let store = MemoryStore::new().with_intraday(IntradaySeries::from_bars(
            "SPY",
            Resolution::FiveMinute,
            bars,
        ));
        assert!(store.load_intraday("SPY", Resolution::FiveMinute).is_some());
        assert!(store.load_intraday("SPY", Resolution::SixtyMinute).is_none());
        assert!(store.load_daily("SPY").is_none());
    }
}
