//! SignalDetector — evaluates a definition over indicator frames.
//!
//! Join contract: a date is evaluated only if it exists in the frame of every
//! ticker the condition references (inner join on date). A missing frame
//! yields no triggers. Undefined indicator values make a comparison false.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use super::expr::{SeriesRef, SignalExpr};
use super::registry::SignalDefinition;
use crate::indicators::{FrameSet, IndicatorFrame};

/// Dates on which the condition held at session close, ascending.
pub fn detect(def: &SignalDefinition, frames: &FrameSet) -> Vec<NaiveDate> {
    detect_expr(&def.when, frames)
}

/// [`detect`] for a bare expression.
pub fn detect_expr(expr: &SignalExpr, frames: &FrameSet) -> Vec<NaiveDate> {
    let tickers = expr.tickers();
    let mut joined: Vec<&IndicatorFrame> = Vec::with_capacity(tickers.len());
    for ticker in &tickers {
        match frames.get(ticker) {
            Some(frame) => joined.push(frame),
            None => {
                debug!(ticker = %ticker, "no frame for referenced ticker, signal yields nothing");
                return Vec::new();
            }
        }
    }
    let Some((first, rest)) = joined.split_first() else {
        return Vec::new();
    };

    let mut triggers = Vec::new();
    for (first_idx, &date) in first.dates().iter().enumerate() {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(joined.len());
        positions.insert(first.ticker(), first_idx);
        let mut in_all = true;
        for frame in rest {
            match frame.index_of(date) {
                Some(i) => {
                    positions.insert(frame.ticker(), i);
                }
                None => {
                    in_all = false;
                    break;
                }
            }
        }
        if !in_all {
            continue;
        }

        let lookup = |r: &SeriesRef| {
            let idx = *positions.get(r.ticker.as_str())?;
            frames.get(&r.ticker)?.value(&r.key, idx)
        };
        if expr.evaluate(&lookup) {
            triggers.push(date);
        }
    }
    triggers
}
