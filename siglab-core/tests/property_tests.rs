//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. RSI bounds — every defined RSI lies in [0, 100]
//! 2. Monotone series — rising closes push RSI above 90, falling below 10
//! 3. Calendar resolution — the trade date is the next reference date
//! 4. Compounding — overnight and intraday compound to the total

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use siglab_core::align::SessionSplit;
use siglab_core::calendar::{resolve_all, resolve_trade_date};
use siglab_core::gap::{classify, GapPattern, ZeroGapPolicy};
use siglab_core::indicators::{compute_ema, compute_rsi, compute_sma};
use siglab_core::returns::{Decomposition, COMPOUNDING_TOLERANCE};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, 0..max_len)
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// Strictly increasing calendar of day offsets from a fixed origin.
fn arb_calendar() -> impl Strategy<Value = Vec<NaiveDate>> {
    prop::collection::vec(1i64..5, 1..60).prop_map(|gaps| {
        let origin = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut day = 0;
        gaps.into_iter()
            .map(|g| {
                day += g;
                origin + Duration::days(day)
            })
            .collect()
    })
}

// ── 1. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_is_bounded(closes in arb_closes(200), period in 2usize..30) {
        let rsi = compute_rsi(&closes, period);
        prop_assert_eq!(rsi.len(), closes.len());
        for v in rsi.iter().flatten() {
            prop_assert!((0.0..=100.0).contains(v), "rsi out of range: {}", v);
        }
    }

    #[test]
    fn warmup_entries_are_absent(closes in arb_closes(120), window in 2usize..40) {
        let sma = compute_sma(&closes, window);
        let ema = compute_ema(&closes, window);
        let rsi = compute_rsi(&closes, window);
        for i in 0..closes.len().min(window - 1) {
            prop_assert!(sma[i].is_none());
            prop_assert!(ema[i].is_none());
            prop_assert!(rsi[i].is_none());
        }
    }
}

// ── 2. Monotone series ───────────────────────────────────────────────

proptest! {
    #[test]
    fn rising_closes_push_rsi_high(start in arb_price(), step in 0.01..5.0_f64) {
        let closes: Vec<f64> = (0..20).map(|i| start + step * i as f64).collect();
        let rsi = compute_rsi(&closes, 10);
        for v in rsi.iter().skip(9) {
            let v = v.unwrap();
            prop_assert!(v > 90.0 && v <= 100.0);
        }
    }

    #[test]
    fn falling_closes_push_rsi_low(start in 200.0..500.0_f64, step in 0.01..5.0_f64) {
        let closes: Vec<f64> = (0..20).map(|i| start - step * i as f64).collect();
        let rsi = compute_rsi(&closes, 10);
        for v in rsi.iter().skip(9) {
            let v = v.unwrap();
            prop_assert!((0.0..10.0).contains(&v));
        }
    }
}

// ── 3. Calendar resolution ───────────────────────────────────────────

proptest! {
    #[test]
    fn trade_date_is_next_reference_date(cal in arb_calendar(), offset in 0i64..300) {
        let trigger = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset);
        match resolve_trade_date(trigger, &cal) {
            Some(trade) => {
                prop_assert!(trade > trigger);
                prop_assert!(cal.contains(&trade));
                prop_assert!(!cal.iter().any(|d| *d > trigger && *d < trade));
            }
            None => prop_assert!(cal.iter().all(|d| *d <= trigger)),
        }
    }

    #[test]
    fn every_trigger_is_resolved_or_dropped(cal in arb_calendar()) {
        let out = resolve_all(&cal, &cal);
        prop_assert_eq!(out.trades.len() + out.dropped.len(), cal.len());
        prop_assert_eq!(out.dropped, vec![*cal.last().unwrap()]);
    }
}

// ── 4. Compounding ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn components_compound_to_total(prev in arb_price(), open in arb_price(), close in arb_price()) {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let dec = Decomposition::from_split(&SessionSplit {
            trade_date: date,
            prev_close: prev,
            session_open: open,
            session_close: close,
        });
        prop_assert!(dec.compounding_error() < COMPOUNDING_TOLERANCE);
    }

    #[test]
    fn classification_is_total(on in -0.1..0.1_f64, id in -0.1..0.1_f64) {
        let p = classify(on, id, ZeroGapPolicy::Up);
        prop_assert!(GapPattern::ALL.contains(&p));
        prop_assert_eq!(p == GapPattern::GapDownReverseUp, on < 0.0 && id > 0.0);
    }
}
