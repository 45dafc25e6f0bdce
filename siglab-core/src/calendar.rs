//! TradingCalendarResolver — trigger date to executable trade date.
//!
//! The trade date for a trigger is the first date strictly after it in a
//! reference series' own date index. Which series serves as the reference is
//! an explicit per-signal choice ([`CalendarSource`]); triggers on the last
//! available reference date have no trade date and are dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which daily table provides the "next trading day".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSource {
    /// The instrument being traded.
    #[default]
    Traded,
    /// The first ticker referenced by the signal's condition.
    Trigger,
    /// An explicit proxy ticker, e.g. a broad index.
    Ticker(String),
}

impl CalendarSource {
    /// Resolve to a concrete ticker given the signal's trigger and traded tickers.
    pub fn ticker<'a>(&'a self, trigger: Option<&'a str>, traded: &'a str) -> &'a str {
        match self {
            CalendarSource::Traded => traded,
            CalendarSource::Trigger => trigger.unwrap_or(traded),
            CalendarSource::Ticker(t) => t,
        }
    }
}

/// A trigger paired with the session on which the position is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDate {
    pub trigger: NaiveDate,
    pub trade: NaiveDate,
}

/// Result of resolving a batch of triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarResolution {
    pub trades: Vec<TradeDate>,
    /// Triggers with no later date in the reference series.
    pub dropped: Vec<NaiveDate>,
}

/// First date in `reference` (ascending) strictly after `trigger`.
pub fn resolve_trade_date(trigger: NaiveDate, reference: &[NaiveDate]) -> Option<NaiveDate> {
    let idx = reference.partition_point(|d| *d <= trigger);
    reference.get(idx).copied()
}

/// Resolve every trigger against the same reference calendar.
pub fn resolve_all(triggers: &[NaiveDate], reference: &[NaiveDate]) -> CalendarResolution {
    let mut out = CalendarResolution::default();
    for &trigger in triggers {
        match resolve_trade_date(trigger, reference) {
            Some(trade) => out.trades.push(TradeDate { trigger, trade }),
            None => out.dropped.push(trigger),
        }
    }
    out
}
