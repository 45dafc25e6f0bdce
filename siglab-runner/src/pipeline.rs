//! Pipeline orchestration: load tables once, then analyze each signal.
//!
//! ```text
//! stores -> MarketData -> frames -> detect -> resolve -> align
//!                                                 |-> decompose / verdict / gaps
//!                                                 |-> holding periods (daily only)
//!                                                 |-> entry timing
//!                                                 |-> hourly profile
//! ```
//!
//! Data problems never fail a run. A signal whose tables are missing comes
//! back with an empty sample and the `missing` list filled in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use siglab_core::align::{DroppedDate, IntradayAligner};
use siglab_core::calendar::{resolve_all, TradeDate};
use siglab_core::domain::{DailySeries, Direction, IntradaySeries, Resolution};
use siglab_core::gap::GapSummary;
use siglab_core::hourly::{self, HourlyProfile};
use siglab_core::indicators::FrameSet;
use siglab_core::returns::{
    decompose_all, holding_summaries, DayTradeVerdict, Decomposition, DecompositionSummary, HoldingSummary,
};
use siglab_core::signals::{detect, SignalDefinition, SignalRegistry};
use siglab_core::timing::{EntryTimingOptimizer, TimingReport};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::store::{DailyBarStore, IntradayBarStore};

/// Every table a set of signals needs, loaded up front.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    daily: HashMap<String, DailySeries>,
    intraday: HashMap<(String, Resolution), IntradaySeries>,
}

impl MarketData {
    /// Load daily tables for every registry ticker and intraday tables for
    /// every traded ticker at the given resolutions.
    pub fn load<S>(registry: &SignalRegistry, resolutions: &BTreeSet<Resolution>, store: &S) -> Self
    where
        S: DailyBarStore + IntradayBarStore + ?Sized,
    {
        let mut data = Self::default();
        for ticker in registry.tickers() {
            match store.load_daily(&ticker) {
                Some(series) => {
                    debug!(%ticker, bars = series.len(), "loaded daily table");
                    data.daily.insert(ticker, series);
                }
                None => warn!(%ticker, "daily table missing"),
            }
        }

        let traded: BTreeSet<&str> = registry.iter().map(|d| d.traded.as_str()).collect();
        for ticker in traded {
            for &resolution in resolutions {
                match store.load_intraday(ticker, resolution) {
                    Some(series) => {
                        debug!(ticker, %resolution, sessions = series.session_count(), "loaded intraday table");
                        data.intraday.insert((ticker.to_string(), resolution), series);
                    }
                    None => warn!(ticker, %resolution, "intraday table missing"),
                }
            }
        }
        data
    }

    pub fn with_daily(mut self, series: DailySeries) -> Self {
        self.daily.insert(series.ticker().to_string(), series);
        self
    }

    pub fn daily(&self, ticker: &str) -> Option<&DailySeries> {
        self.daily.get(ticker)
    }

    pub fn intraday(&self, ticker: &str, resolution: Resolution) -> Option<&IntradaySeries> {
        self.intraday.get(&(ticker.to_string(), resolution))
    }

    pub fn dailies(&self) -> impl Iterator<Item = &DailySeries> {
        self.daily.values()
    }
}

/// Outcome of aligning trade dates against one intraday table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCoverage {
    pub resolution: Resolution,
    /// Whether the table was found at all.
    pub table: bool,
    pub aligned: usize,
    pub dropped: Vec<DroppedDate>,
}

/// Everything computed for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalAnalysis {
    pub id: String,
    pub description: String,
    pub traded: String,
    pub direction: Direction,
    pub calendar_ticker: String,
    /// Referenced tickers with no daily table.
    pub missing: Vec<String>,
    pub triggers: Vec<NaiveDate>,
    pub trades: Vec<TradeDate>,
    /// Triggers with no later date on the reference calendar.
    pub calendar_dropped: Vec<NaiveDate>,
    pub coverage: Vec<SessionCoverage>,
    /// Direction-adjusted per-date decompositions.
    pub decompositions: Vec<Decomposition>,
    pub summary: DecompositionSummary,
    pub verdict: Option<DayTradeVerdict>,
    pub holding: Vec<HoldingSummary>,
    pub gaps: GapSummary,
    pub timing: TimingReport,
    pub hourly: HourlyProfile,
}

impl SignalAnalysis {
    /// Number of trade dates with a usable session.
    pub fn sample_size(&self) -> usize {
        self.summary.count
    }

    pub fn trade_dates(&self) -> Vec<NaiveDate> {
        self.trades.iter().map(|t| t.trade).collect()
    }

    pub fn coverage_for(&self, resolution: Resolution) -> Option<&SessionCoverage> {
        self.coverage.iter().find(|c| c.resolution == resolution)
    }

    /// BLAKE3 of the JSON form. Identical inputs give identical fingerprints.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Runs the registry's signals over loaded market data.
#[derive(Debug)]
pub struct Pipeline {
    config: AnalysisConfig,
    registry: SignalRegistry,
    data: MarketData,
    frames: FrameSet,
}

impl Pipeline {
    /// Load every table the registry needs from `store` and compute frames.
    pub fn new<S>(config: AnalysisConfig, registry: SignalRegistry, store: &S) -> Self
    where
        S: DailyBarStore + IntradayBarStore + ?Sized,
    {
        let data = MarketData::load(&registry, &Self::resolutions(&config), store);
        Self::from_data(config, registry, data)
    }

    pub fn from_data(config: AnalysisConfig, registry: SignalRegistry, data: MarketData) -> Self {
        let specs = config.indicator_specs(&registry);
        let frames = FrameSet::compute(data.dailies(), &specs);
        info!(
            signals = registry.len(),
            tickers = frames.len(),
            indicators = specs.len(),
            "pipeline ready"
        );
        Self {
            config,
            registry,
            data,
            frames,
        }
    }

    fn resolutions(config: &AnalysisConfig) -> BTreeSet<Resolution> {
        let r = &config.resolutions;
        [r.sessions, r.timing, r.hourly].into_iter().collect()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    pub fn frames(&self) -> &FrameSet {
        &self.frames
    }

    pub fn data(&self) -> &MarketData {
        &self.data
    }

    /// Analyze one registered signal. `None` if the id is not registered.
    pub fn analyze(&self, id: &str) -> Option<SignalAnalysis> {
        self.registry.get(id).map(|def| self.run(def))
    }

    /// Analyze every signal in parallel, results in registry order.
    pub fn analyze_all(&self) -> Vec<SignalAnalysis> {
        let defs: Vec<&SignalDefinition> = self.registry.iter().collect();
        defs.par_iter().map(|def| self.run(def)).collect()
    }

    fn run(&self, def: &SignalDefinition) -> SignalAnalysis {
        let calendar_ticker = def.calendar_ticker();
        let missing: Vec<String> = def
            .tickers()
            .into_iter()
            .filter(|t| self.data.daily(t).is_none())
            .collect();
        if !missing.is_empty() {
            warn!(signal = %def.id, ?missing, "signal has missing daily tables");
        }

        let triggers = detect(def, &self.frames);
        let calendar = self
            .data
            .daily(&calendar_ticker)
            .map(|s| s.dates())
            .unwrap_or_default();
        let resolved = resolve_all(&triggers, &calendar);
        if !resolved.dropped.is_empty() {
            debug!(signal = %def.id, dropped = ?resolved.dropped, "triggers without a trade date");
        }
        let trade_dates: Vec<NaiveDate> = resolved.trades.iter().map(|t| t.trade).collect();

        let traded_daily = self.data.daily(&def.traded);
        let mut coverage = Vec::new();
        let mut alignments = BTreeMap::new();
        for resolution in Self::resolutions(&self.config) {
            let table = self.data.intraday(&def.traded, resolution);
            let alignment = match (traded_daily, table) {
                (Some(daily), Some(table)) => {
                    let aligner = IntradayAligner::new(self.config.alignment.get(resolution).clone());
                    aligner.align(&trade_dates, daily, table)
                }
                _ => Default::default(),
            };
            coverage.push(SessionCoverage {
                resolution,
                table: table.is_some(),
                aligned: alignment.sessions.len(),
                dropped: alignment.dropped.clone(),
            });
            alignments.insert(resolution, alignment);
        }

        let stage = |resolution: Resolution| alignments.get(&resolution).map(|a| a.sessions.as_slice()).unwrap_or(&[]);
        let res = &self.config.resolutions;

        let splits: Vec<_> = stage(res.sessions).iter().map(|s| s.split).collect();
        let raw = decompose_all(&splits, Direction::Long);
        let decompositions = decompose_all(&splits, def.direction);
        let summary = DecompositionSummary::compute(&decompositions, self.config.contribution_fallback);
        let verdict = summary.verdict();
        let gaps = GapSummary::compute(&raw, def.direction, self.config.zero_gap);

        let holding = match traded_daily {
            Some(daily) => holding_summaries(daily, &trade_dates, &self.config.holding_periods, def.direction),
            None => Vec::new(),
        };

        let timing = EntryTimingOptimizer::new(self.config.timing.clone()).evaluate(stage(res.timing), def.direction);
        let hourly = hourly::profile(stage(res.hourly), def.direction);

        info!(
            signal = %def.id,
            triggers = triggers.len(),
            trades = resolved.trades.len(),
            sessions = summary.count,
            "signal analyzed"
        );

        SignalAnalysis {
            id: def.id.clone(),
            description: def.description.clone(),
            traded: def.traded.clone(),
            direction: def.direction,
            calendar_ticker,
            missing,
            triggers,
            trades: resolved.trades,
            calendar_dropped: resolved.dropped,
            coverage,
            decompositions,
            summary,
            verdict,
            holding,
            gaps,
            timing,
            hourly,
        }
    }
}
