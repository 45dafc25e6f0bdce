//! Latest-value snapshot of the indicator state and the playbook checks.
//!
//! A snapshot reads only the last row of each frame. Values are rounded the
//! way they are published (prices and returns 2dp, RSI and percent-vs-SMA
//! 1dp) and every check is evaluated on the rounded figures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};
use siglab_core::indicators::{FrameSet, IndicatorFrame, IndicatorSpec};
use siglab_core::signals::{Comparison, Operand, SeriesRef, SignalExpr};

use crate::config::ConfigError;

pub const SNAPSHOT_VERSION: &str = "1.0";

// ── Configuration ────────────────────────────────────────────────────

/// One named single-threshold check, e.g. `GLD.rsi10 > 79`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCheck {
    pub ticker: String,
    #[serde(default = "default_check_key")]
    pub key: String,
    pub cmp: Comparison,
    pub threshold: f64,
}

fn default_check_key() -> String {
    "rsi10".to_string()
}

impl ThresholdCheck {
    pub fn new(ticker: &str, cmp: Comparison, threshold: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            key: default_check_key(),
            cmp,
            threshold,
        }
    }

    /// The checked series, with the key in frame spelling.
    pub fn series(&self) -> SeriesRef {
        let key = self
            .key
            .parse::<IndicatorSpec>()
            .map(|spec| spec.to_string())
            .unwrap_or_else(|_| self.key.to_ascii_lowercase());
        SeriesRef::new(&self.ticker, key)
    }

    /// Published name, e.g. `GLD_RSI_gt_79`.
    pub fn name(&self) -> String {
        let series = self.series();
        let key = if series.key == "rsi10" {
            "RSI".to_string()
        } else {
            series.key.to_uppercase()
        };
        let op = match self.cmp {
            Comparison::Gt => "gt",
            Comparison::Ge => "ge",
            Comparison::Lt => "lt",
            Comparison::Le => "le",
        };
        format!("{}_{}_{}_{}", self.ticker, key, op, format_threshold(self.threshold))
    }
}

fn format_threshold(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

/// A multi-ticker condition with the alert line printed when it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    pub id: String,
    pub when: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alert: String,
}

impl ComboConfig {
    fn new(id: &str, when: &str, description: &str, alert: &str) -> Self {
        Self {
            id: id.to_string(),
            when: when.to_string(),
            description: description.to_string(),
            alert: alert.to_string(),
        }
    }

    pub fn expr(&self) -> Result<SignalExpr, ConfigError> {
        self.when.parse().map_err(|source| ConfigError::Condition {
            id: self.id.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondConfig {
    /// Sign of its 10-day return sets the bond direction.
    pub primary: String,
    pub secondary: String,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            primary: "TLT".into(),
            secondary: "BND".into(),
        }
    }
}

/// Distance-over-SMA200 levels, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub ticker: String,
    pub trim: f64,
    pub warn: f64,
    pub sell: f64,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            ticker: "SMH".into(),
            trim: 30.0,
            warn: 35.0,
            sell: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrarianConfig {
    pub tickers: Vec<String>,
    pub active_below_rsi: f64,
    pub watch_below_rsi: f64,
}

impl Default for ContrarianConfig {
    fn default() -> Self {
        Self {
            tickers: strings(&["FAS", "TECL", "FNGO", "LABU", "NAIL"]),
            active_below_rsi: 40.0,
            watch_below_rsi: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedConfig {
    pub tickers: Vec<String>,
    /// Percent over SMA200 for ELEVATED.
    pub elevated_above: f64,
    /// Percent over SMA200 for EXTENDED.
    pub extended_above: f64,
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self {
            tickers: strings(&["SOXL", "KORU", "EDC", "HIBL", "LABU", "SMH"]),
            elevated_above: 50.0,
            extended_above: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Universe loaded for a snapshot run.
    pub tickers: Vec<String>,
    /// Tickers with fewer daily bars are left out.
    pub min_bars: usize,
    pub thresholds: Vec<ThresholdCheck>,
    pub combos: Vec<ComboConfig>,
    pub bond: BondConfig,
    pub levels: LevelsConfig,
    pub contrarian: ContrarianConfig,
    pub extended: ExtendedConfig,
    /// Tickers kept in `indicators` in compact mode.
    pub compact_tickers: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        use Comparison::{Gt, Lt};
        Self {
            tickers: strings(&[
                "SPY", "QQQ", "SMH", "IWM", "XLP", "XLU", "XLV", "XLF", "XLE", "GLD", "TLT", "HYG",
                "LQD", "TMV", "USDU", "BND", "UCO", "BOIL", "DBC", "UVXY", "SVXY", "VIXY", "VIXM",
                "TQQQ", "SOXL", "SOXS", "TECL", "FAS", "UPRO", "NAIL", "CURE", "LABU", "DRN",
                "FNGO", "HIBL", "EDC", "YINN", "KORU", "EURL", "INDL", "BTC-USD", "AMD", "NVDA",
                "VOOV", "VOOG", "VTV", "QQQE", "KMLM", "DBMF", "CTA", "BTAL",
            ]),
            min_bars: 200,
            thresholds: vec![
                ThresholdCheck::new("GLD", Gt, 79.0),
                ThresholdCheck::new("USDU", Lt, 25.0),
                ThresholdCheck::new("XLP", Gt, 65.0),
                ThresholdCheck::new("XLP", Gt, 75.0),
                ThresholdCheck::new("SPY", Gt, 79.0),
                ThresholdCheck::new("QQQ", Gt, 79.0),
                ThresholdCheck::new("SMH", Gt, 79.0),
                ThresholdCheck::new("XLF", Gt, 70.0),
                ThresholdCheck::new("UVXY", Gt, 82.0),
                ThresholdCheck::new("VIXM", Lt, 25.0),
            ],
            combos: vec![
                ComboConfig::new(
                    "double_signal",
                    "GLD.rsi10 > 79 and USDU.rsi10 < 25",
                    "GLD RSI>79 + USDU RSI<25 -> TQQQ buy",
                    "DOUBLE SIGNAL: GLD/USDU -> TQQQ buy",
                ),
                ComboConfig::new(
                    "triple_signal",
                    "GLD.rsi10 > 79 and USDU.rsi10 < 25 and XLP.rsi10 > 65",
                    "Double + XLP RSI>65 -> TQQQ high conviction",
                    "TRIPLE SIGNAL: GLD/USDU/XLP -> TQQQ high conviction",
                ),
                ComboConfig::new(
                    "xlp_cascade",
                    "XLP.rsi10 > 75",
                    "XLP RSI>75 -> UVXY 1-day hold",
                    "XLP CASCADE: RSI>75 -> UVXY 1-day hold",
                ),
            ],
            bond: BondConfig::default(),
            levels: LevelsConfig::default(),
            contrarian: ContrarianConfig::default(),
            extended: ExtendedConfig::default(),
            compact_tickers: strings(&[
                "SPY", "QQQ", "SMH", "GLD", "USDU", "XLP", "TLT", "UVXY", "SVXY", "VIXM", "TQQQ",
                "SOXL", "UPRO", "FAS", "TECL", "FNGO", "KMLM", "BTAL", "BND", "BTC-USD",
            ]),
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_bars == 0 {
            return Err(ConfigError::Invalid("snapshot.min_bars must be >= 1".into()));
        }
        for combo in &self.combos {
            combo.expr()?;
        }
        Ok(())
    }

    /// Every ticker a snapshot reads, in first-mention order.
    pub fn required_tickers(&self) -> Result<Vec<String>, ConfigError> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |t: &str| {
            if !out.iter().any(|o| o == t) {
                out.push(t.to_string());
            }
        };
        self.tickers.iter().for_each(|t| push(t));
        self.thresholds.iter().for_each(|c| push(&c.ticker));
        for combo in &self.combos {
            for t in combo.expr()?.tickers() {
                push(&t);
            }
        }
        push(&self.bond.primary);
        push(&self.bond.secondary);
        push(&self.levels.ticker);
        self.contrarian.tickers.iter().for_each(|t| push(t));
        self.extended.tickers.iter().for_each(|t| push(t));
        Ok(out)
    }

    /// Indicator series the snapshot fields and checks read.
    pub fn indicator_specs(&self) -> Result<Vec<IndicatorSpec>, ConfigError> {
        let mut specs = IndicatorSpec::default_set();
        let mut add = |key: &str, id: &str| -> Result<(), ConfigError> {
            let spec = key.parse::<IndicatorSpec>().map_err(|source| ConfigError::Indicator {
                id: id.to_string(),
                source,
            })?;
            if !specs.contains(&spec) {
                specs.push(spec);
            }
            Ok(())
        };
        for check in &self.thresholds {
            add(&check.key, &check.name())?;
        }
        for combo in &self.combos {
            for series in combo.expr()?.series() {
                add(&series.key, &combo.id)?;
            }
        }
        Ok(specs)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Rounding ─────────────────────────────────────────────────────────

fn round_to(v: f64, places: i32) -> f64 {
    let m = 10f64.powi(places);
    (v * m).round() / m
}

/// Published precision of an indicator key.
fn places_for(key: &str) -> i32 {
    if key.starts_with("rsi") || key.starts_with("vs_sma") {
        1
    } else {
        2
    }
}

fn rounded(key: &str, v: Option<f64>) -> Option<f64> {
    v.map(|v| round_to(v, places_for(key)))
}

// ── Per-ticker indicators ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmaCross {
    Bull,
    Bear,
}

/// Latest indicator values of one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerIndicators {
    pub price: Option<f64>,
    pub change_pct: Option<f64>,
    pub rsi10: Option<f64>,
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub ema_cross: Option<EmaCross>,
    pub above_sma200: Option<bool>,
    pub vs_sma200: Option<f64>,
    pub vs_sma50: Option<f64>,
    pub vs_ema9: Option<f64>,
    pub vs_ema20: Option<f64>,
    pub ret_1d: Option<f64>,
    pub ret_5d: Option<f64>,
    pub ret_10d: Option<f64>,
    pub ret_20d: Option<f64>,
    pub above_ema9: Option<bool>,
    pub above_ema20: Option<bool>,
    pub above_ema50: Option<bool>,
}

impl TickerIndicators {
    pub fn from_frame(frame: &IndicatorFrame) -> Self {
        let raw = |key: &str| frame.latest(key);
        let get = |key: &str| rounded(key, raw(key));
        let above = |a: Option<f64>, b: Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some(a > b),
            _ => None,
        };
        let price = raw("close");
        let ret_1d = get("ret1d");
        Self {
            price: rounded("close", price),
            change_pct: ret_1d,
            rsi10: get("rsi10"),
            ema9: get("ema9"),
            ema20: get("ema20"),
            ema50: get("ema50"),
            ema200: get("ema200"),
            sma50: get("sma50"),
            sma200: get("sma200"),
            ema_cross: above(raw("ema9"), raw("ema20")).map(|bull| if bull { EmaCross::Bull } else { EmaCross::Bear }),
            above_sma200: above(price, raw("sma200")),
            vs_sma200: get("vs_sma200"),
            vs_sma50: get("vs_sma50"),
            vs_ema9: get("vs_ema9"),
            vs_ema20: get("vs_ema20"),
            ret_1d,
            ret_5d: get("ret5d"),
            ret_10d: get("ret10d"),
            ret_20d: get("ret20d"),
            above_ema9: above(price, raw("ema9")),
            above_ema20: above(price, raw("ema20")),
            above_ema50: above(price, raw("ema50")),
        }
    }
}

// ── Signal sections ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdState {
    pub value: Option<f64>,
    pub threshold: f64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboState {
    pub active: bool,
    pub description: String,
    /// Per-ticker result of that ticker's comparisons.
    pub components: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BondDirection {
    Rising,
    Falling,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conviction {
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondMomentum {
    pub direction: BondDirection,
    pub primary_ret_10d: Option<f64>,
    pub secondary_ret_10d: Option<f64>,
    /// Conviction of volatility longs: bonds falling means HIGH.
    pub uvxy_conviction: Option<Conviction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    pub ticker: String,
    pub price: Option<f64>,
    pub sma200: Option<f64>,
    pub pct_above: Option<f64>,
    pub trim_level: Option<f64>,
    pub warn_level: Option<f64>,
    pub sell_level: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContrarianStatus {
    Active,
    Watch,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrarianState {
    pub rsi10: Option<f64>,
    pub below_sma200: bool,
    pub bear_ema: bool,
    pub status: ContrarianStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtensionWarning {
    Elevated,
    Extended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedState {
    pub vs_sma200: f64,
    pub rsi10: Option<f64>,
    pub warning: ExtensionWarning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSignals {
    pub playbook: BTreeMap<String, ThresholdState>,
    pub combos: BTreeMap<String, ComboState>,
    pub bond_momentum: BondMomentum,
    pub smh_levels: LevelState,
    pub contrarian: BTreeMap<String, ContrarianState>,
    pub extended: BTreeMap<String, ExtendedState>,
    pub active_alerts: Vec<String>,
}

impl SnapshotSignals {
    /// Evaluate every section against the included tickers.
    ///
    /// `lookup` resolves condition operands; it must return rounded values
    /// and `None` for tickers left out of `indicators`.
    pub fn evaluate<F>(
        indicators: &BTreeMap<String, TickerIndicators>,
        lookup: &F,
        config: &SnapshotConfig,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&SeriesRef) -> Option<f64>,
    {
        let playbook = config
            .thresholds
            .iter()
            .map(|check| {
                let value = lookup(&check.series());
                let active = value.is_some_and(|v| check.cmp.holds(v, check.threshold));
                let state = ThresholdState {
                    value,
                    threshold: check.threshold,
                    active,
                };
                (check.name(), state)
            })
            .collect();

        let mut combos = BTreeMap::new();
        let mut alerts = Vec::new();
        for combo in &config.combos {
            let expr = combo.expr()?;
            let active = expr.evaluate(lookup);
            if active && !combo.alert.is_empty() {
                alerts.push(combo.alert.clone());
            }
            combos.insert(
                combo.id.clone(),
                ComboState {
                    active,
                    description: combo.description.clone(),
                    components: components(&expr, lookup),
                },
            );
        }

        let ind = |t: &str| indicators.get(t);

        let primary_ret = ind(&config.bond.primary).and_then(|i| i.ret_10d);
        let direction = match primary_ret {
            Some(r) if r > 0.0 => BondDirection::Rising,
            Some(_) => BondDirection::Falling,
            None => BondDirection::Unknown,
        };
        let bond_momentum = BondMomentum {
            direction,
            primary_ret_10d: primary_ret,
            secondary_ret_10d: ind(&config.bond.secondary).and_then(|i| i.ret_10d),
            uvxy_conviction: match direction {
                BondDirection::Rising => Some(Conviction::Moderate),
                BondDirection::Falling => Some(Conviction::High),
                BondDirection::Unknown => None,
            },
        };

        let lv = ind(&config.levels.ticker);
        let sma200 = lv.and_then(|i| i.sma200);
        let level = |pct: f64| sma200.map(|s| round_to(s * (1.0 + pct / 100.0), 2));
        let smh_levels = LevelState {
            ticker: config.levels.ticker.clone(),
            price: lv.and_then(|i| i.price),
            sma200,
            pct_above: lv.and_then(|i| i.vs_sma200),
            trim_level: level(config.levels.trim),
            warn_level: level(config.levels.warn),
            sell_level: level(config.levels.sell),
        };

        let mut contrarian = BTreeMap::new();
        for ticker in &config.contrarian.tickers {
            let i = ind(ticker);
            let rsi10 = i.and_then(|i| i.rsi10);
            let below_sma200 = i.and_then(|i| i.above_sma200) == Some(false);
            let bear_ema = i.and_then(|i| i.ema_cross) == Some(EmaCross::Bear);
            let status = match rsi10 {
                Some(r) if below_sma200 && r < config.contrarian.active_below_rsi => ContrarianStatus::Active,
                Some(r) if below_sma200 && r < config.contrarian.watch_below_rsi => ContrarianStatus::Watch,
                _ => ContrarianStatus::Inactive,
            };
            match status {
                ContrarianStatus::Active => alerts.push(format!(
                    "{ticker} CONTRARIAN: RSI<{} + below SMA200",
                    format_threshold(config.contrarian.active_below_rsi)
                )),
                ContrarianStatus::Watch => {
                    alerts.push(format!("{ticker} WATCH: below SMA200, approaching oversold"))
                }
                ContrarianStatus::Inactive => {}
            }
            contrarian.insert(
                ticker.clone(),
                ContrarianState {
                    rsi10,
                    below_sma200,
                    bear_ema,
                    status,
                },
            );
        }

        let mut extended = BTreeMap::new();
        for ticker in &config.extended.tickers {
            let Some(i) = ind(ticker) else { continue };
            let Some(vs) = i.vs_sma200.filter(|v| *v > config.extended.elevated_above) else {
                continue;
            };
            let warning = if vs > config.extended.extended_above {
                ExtensionWarning::Extended
            } else {
                ExtensionWarning::Elevated
            };
            let word = match warning {
                ExtensionWarning::Extended => "EXTENDED",
                ExtensionWarning::Elevated => "ELEVATED",
            };
            alerts.push(format!("{ticker} {word}: {vs:+.0}% above SMA200"));
            extended.insert(
                ticker.clone(),
                ExtendedState {
                    vs_sma200: vs,
                    rsi10: i.rsi10,
                    warning,
                },
            );
        }

        Ok(Self {
            playbook,
            combos,
            bond_momentum,
            smh_levels,
            contrarian,
            extended,
            active_alerts: alerts,
        })
    }
}

/// Per-ticker conjunction of the comparisons that reference it.
fn components<F>(expr: &SignalExpr, lookup: &F) -> BTreeMap<String, bool>
where
    F: Fn(&SeriesRef) -> Option<f64>,
{
    let mut out = BTreeMap::new();
    let mut stack = vec![expr];
    while let Some(e) = stack.pop() {
        match e {
            SignalExpr::And { all: items } | SignalExpr::Or { any: items } => stack.extend(items.iter()),
            SignalExpr::Compare { left, .. } => {
                if let Operand::Series(s) = left {
                    let holds = e.evaluate(lookup);
                    let entry = out.entry(s.ticker.clone()).or_insert(true);
                    *entry &= holds;
                }
            }
        }
    }
    out
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub generated_utc: String,
    pub generated_et: String,
    /// Tickers with enough history, before any compact filtering.
    pub ticker_count: usize,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub signals: SnapshotSignals,
    pub indicators: BTreeMap<String, TickerIndicators>,
}

impl Snapshot {
    pub fn build(frames: &FrameSet, config: &SnapshotConfig, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let included: BTreeMap<&str, &IndicatorFrame> = frames
            .iter()
            .filter(|f| f.len() >= config.min_bars)
            .map(|f| (f.ticker(), f))
            .collect();
        let indicators: BTreeMap<String, TickerIndicators> = included
            .iter()
            .map(|(t, f)| (t.to_string(), TickerIndicators::from_frame(f)))
            .collect();

        let lookup = |r: &SeriesRef| {
            let frame = included.get(r.ticker.as_str())?;
            rounded(&r.key, frame.latest(&r.key))
        };
        let signals = SnapshotSignals::evaluate(&indicators, &lookup, config)?;

        let et = now.with_timezone(&New_York);
        Ok(Self {
            meta: SnapshotMeta {
                generated_utc: now.to_rfc3339(),
                generated_et: et.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
                ticker_count: indicators.len(),
                version: SNAPSHOT_VERSION.to_string(),
            },
            signals,
            indicators,
        })
    }

    /// Keep only the configured key tickers in `indicators`.
    pub fn compact(mut self, config: &SnapshotConfig) -> Self {
        self.indicators
            .retain(|t, _| config.compact_tickers.iter().any(|k| k == t));
        self
    }
}
