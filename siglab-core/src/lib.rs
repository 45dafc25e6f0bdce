//! siglab core — signal detection, calendar resolution, intraday alignment and
//! return decomposition.
//!
//! Everything in this crate is a pure function over fully-loaded tables:
//! - Domain types (daily/intraday bars, series, direction)
//! - Indicator engine (RSI, SMA, EMA, n-day change, percent above average)
//! - Signal definitions as data, evaluated over indicator frames
//! - Trading-calendar resolution of trigger dates into trade dates
//! - Cross-resolution alignment of trade dates to intraday sessions
//! - Overnight / intraday decomposition, gap classification, entry timing and
//!   hourly profiles

pub mod align;
pub mod calendar;
pub mod domain;
pub mod gap;
pub mod hourly;
pub mod indicators;
pub mod returns;
pub mod signals;
pub mod stats;
pub mod timing;
