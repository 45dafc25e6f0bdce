//! Data-availability check over every ticker a registry references.

use chrono::NaiveDate;
use serde::Serialize;
use siglab_core::domain::Resolution;
use siglab_core::signals::SignalRegistry;

use crate::store::{DailyBarStore, IntradayBarStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpan {
    pub bars: usize,
    /// Distinct dates: trading days for daily tables, sessions for intraday.
    pub days: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerAvailability {
    pub ticker: String,
    pub daily: Option<TableSpan>,
    pub intraday: Vec<(Resolution, Option<TableSpan>)>,
}

/// A table that could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTable {
    pub ticker: String,
    /// `None` for the daily table.
    pub resolution: Option<Resolution>,
}

impl std::fmt::Display for MissingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.resolution {
            Some(r) => write!(f, "{} {}", self.ticker, r.label()),
            None => write!(f, "{} daily", self.ticker),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub tickers: Vec<TickerAvailability>,
    pub missing: Vec<MissingTable>,
}

/// Inspect daily and both intraday tables for every registry ticker.
pub fn check<S>(registry: &SignalRegistry, store: &S) -> AvailabilityReport
where
    S: DailyBarStore + IntradayBarStore + ?Sized,
{
    let mut tickers = Vec::new();
    let mut missing = Vec::new();
    for ticker in registry.tickers() {
        let daily = store.load_daily(&ticker).map(|s| TableSpan {
            bars: s.len(),
            days: s.len(),
            first: s.first_date(),
            last: s.last_date(),
        });
        if daily.is_none() {
            missing.push(MissingTable {
                ticker: ticker.clone(),
                resolution: None,
            });
        }

        let intraday = Resolution::ALL
            .into_iter()
            .map(|resolution| {
                let span = store.load_intraday(&ticker, resolution).map(|s| TableSpan {
                    bars: s.bar_count(),
                    days: s.session_count(),
                    first: s.first_date(),
                    last: s.last_date(),
                });
                if span.is_none() {
                    missing.push(MissingTable {
                        ticker: ticker.clone(),
                        resolution: Some(resolution),
                    });
                }
                (resolution, span)
            })
            .collect();

        tickers.push(TickerAvailability {
            ticker,
            daily,
            intraday,
        });
    }
    AvailabilityReport { tickers, missing }
}
