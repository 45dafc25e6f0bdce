//! ReturnDecomposer — overnight / intraday / total return per trade date.
//!
//! overnight = session_open / prev_close − 1
//! intraday  = session_close / session_open − 1
//! total     = session_close / prev_close − 1
//!
//! All three come straight from prices, so (1 + overnight)(1 + intraday) − 1
//! equals total up to rounding. Short signals negate the three figures; the
//! prices themselves are never touched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::align::SessionSplit;
use crate::domain::{DailySeries, Direction};
use crate::stats::{mean, win_rate};

/// Tolerance for the compounding identity.
pub const COMPOUNDING_TOLERANCE: f64 = 1e-9;

/// Return components of one trade date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub trade_date: NaiveDate,
    pub overnight: f64,
    pub intraday: f64,
    pub total: f64,
}

impl Decomposition {
    /// Raw price returns of a session split.
    pub fn from_split(split: &SessionSplit) -> Self {
        Self {
            trade_date: split.trade_date,
            overnight: split.session_open / split.prev_close - 1.0,
            intraday: split.session_close / split.session_open - 1.0,
            total: split.session_close / split.prev_close - 1.0,
        }
    }

    /// The same figures from a direction's point of view.
    pub fn directed(&self, direction: Direction) -> Self {
        Self {
            trade_date: self.trade_date,
            overnight: direction.apply(self.overnight),
            intraday: direction.apply(self.intraday),
            total: direction.apply(self.total),
        }
    }

    /// |total − ((1 + overnight)(1 + intraday) − 1)|, meaningful for raw returns.
    pub fn compounding_error(&self) -> f64 {
        let compounded = (1.0 + self.overnight) * (1.0 + self.intraday) - 1.0;
        (self.total - compounded).abs()
    }
}

/// What to report as contribution when the mean total return is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionFallback {
    /// 50 / 50. A placeholder, not a meaningful statistic.
    #[default]
    EvenSplit,
    /// Leave both contributions undefined.
    Undefined,
}

/// Mean and win rate of one return component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentStats {
    pub mean: f64,
    pub win_rate: f64,
}

impl ComponentStats {
    fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            win_rate: win_rate(values),
        }
    }
}

/// Aggregate over a set of (direction-adjusted) decompositions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecompositionSummary {
    pub count: usize,
    pub overnight: ComponentStats,
    pub intraday: ComponentStats,
    pub total: ComponentStats,
    /// Percent of mean total explained by the overnight component.
    pub overnight_contribution: Option<f64>,
    pub intraday_contribution: Option<f64>,
}

impl DecompositionSummary {
    pub fn compute(decomps: &[Decomposition], fallback: ContributionFallback) -> Self {
        let overnight: Vec<f64> = decomps.iter().map(|d| d.overnight).collect();
        let intraday: Vec<f64> = decomps.iter().map(|d| d.intraday).collect();
        let total: Vec<f64> = decomps.iter().map(|d| d.total).collect();

        let overnight = ComponentStats::of(&overnight);
        let intraday = ComponentStats::of(&intraday);
        let total = ComponentStats::of(&total);

        let (overnight_contribution, intraday_contribution) = if decomps.is_empty() {
            (None, None)
        } else if total.mean == 0.0 {
            match fallback {
                ContributionFallback::EvenSplit => (Some(50.0), Some(50.0)),
                ContributionFallback::Undefined => (None, None),
            }
        } else {
            (
                Some(overnight.mean / total.mean * 100.0),
                Some(intraday.mean / total.mean * 100.0),
            )
        };

        Self {
            count: decomps.len(),
            overnight,
            intraday,
            total,
            overnight_contribution,
            intraday_contribution,
        }
    }
}

/// Whether the edge of a signal can be captured without holding overnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayTradeVerdict {
    /// At least 60% of the mean total comes from the intraday component.
    Good,
    /// Between 40% and 60%.
    Mixed,
    NotDayTradeable,
}

impl DayTradeVerdict {
    pub fn from_intraday_contribution(pct: f64) -> Self {
        if pct >= 60.0 {
            DayTradeVerdict::Good
        } else if pct >= 40.0 {
            DayTradeVerdict::Mixed
        } else {
            DayTradeVerdict::NotDayTradeable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayTradeVerdict::Good => "GOOD",
            DayTradeVerdict::Mixed => "MIXED",
            DayTradeVerdict::NotDayTradeable => "NOT DAY-TRADEABLE",
        }
    }
}

impl DecompositionSummary {
    /// `None` when the intraday contribution is undefined.
    pub fn verdict(&self) -> Option<DayTradeVerdict> {
        self.intraday_contribution
            .map(DayTradeVerdict::from_intraday_contribution)
    }
}

/// Decompose every split from a direction's point of view.
pub fn decompose_all(splits: &[SessionSplit], direction: Direction) -> Vec<Decomposition> {
    splits
        .iter()
        .map(|s| Decomposition::from_split(s).directed(direction))
        .collect()
}

/// Multi-day decomposition of one trade date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldingDecomposition {
    pub trade_date: NaiveDate,
    pub days: usize,
    /// Sum of each day's own overnight return.
    pub overnight: f64,
    /// Sum of each day's own intraday return.
    pub intraday: f64,
    /// Close-to-close return over the holding period.
    pub total: f64,
}

/// Walk `days` trading-day positions forward from `trade_date` in the daily table.
///
/// Day k contributes open[k]/close[k−1] − 1 overnight and close[k]/open[k] − 1
/// intraday. `None` when the trade date is not in the table, has no prior bar,
/// or fewer than `days` bars remain.
pub fn holding_decomposition(
    daily: &DailySeries,
    trade_date: NaiveDate,
    days: usize,
    direction: Direction,
) -> Option<HoldingDecomposition> {
    if days == 0 {
        return None;
    }
    let start = daily.index_of(trade_date)?;
    if start == 0 {
        return None;
    }
    let end = start + days;
    let bars = daily.bars();
    if end > bars.len() {
        return None;
    }

    let mut overnight = 0.0;
    let mut intraday = 0.0;
    for k in start..end {
        let prev = bars[k - 1].close;
        let bar = &bars[k];
        if prev <= 0.0 || bar.open <= 0.0 {
            return None;
        }
        overnight += bar.open / prev - 1.0;
        intraday += bar.close / bar.open - 1.0;
    }
    let total = bars[end - 1].close / bars[start - 1].close - 1.0;

    Some(HoldingDecomposition {
        trade_date,
        days,
        overnight: direction.apply(overnight),
        intraday: direction.apply(intraday),
        total: direction.apply(total),
    })
}

/// Aggregate for one holding period.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub days: usize,
    pub count: usize,
    /// Trade dates with fewer than `days` bars of future data.
    pub excluded: usize,
    pub overnight: ComponentStats,
    pub intraday: ComponentStats,
    pub total: ComponentStats,
}

/// Summaries for each holding period, in the order given.
pub fn holding_summaries(
    daily: &DailySeries,
    trade_dates: &[NaiveDate],
    periods: &[usize],
    direction: Direction,
) -> Vec<HoldingSummary> {
    periods
        .iter()
        .map(|&days| {
            let rows: Vec<HoldingDecomposition> = trade_dates
                .iter()
                .filter_map(|&d| holding_decomposition(daily, d, days, direction))
                .collect();
            let pick = |f: fn(&HoldingDecomposition) -> f64| -> Vec<f64> {
                rows.iter().map(f).collect()
            };
            HoldingSummary {
                days,
                count: rows.len(),
                excluded: trade_dates.len() - rows.len(),
                overnight: ComponentStats::of(&pick(|r| r.overnight)),
                intraday: ComponentStats::of(&pick(|r| r.intraday)),
                total: ComponentStats::of(&pick(|r| r.total)),
            }
        })
        .collect()
}
