//! Criterion benchmarks for siglab hot paths.
//!
//! Benchmarks:
//! 1. Single indicators over long close series (RSI, SMA, EMA)
//! 2. Full default indicator frame for one ticker
//! 3. Signal detection over a multi-ticker frame set

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use siglab_core::domain::{DailyBar, DailySeries, Direction};
use siglab_core::indicators::{compute_ema, compute_rsi, compute_sma, FrameSet, IndicatorFrame, IndicatorSpec};
use siglab_core::signals::{detect, SignalDefinition};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01)
        .collect()
}

fn make_series(ticker: &str, n: usize, phase: f64) -> DailySeries {
    let base = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1 + phase).sin() * 10.0;
            DailyBar {
                date: base + Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                adj_close: None,
            }
        })
        .collect();
    DailySeries::from_bars(ticker, bars)
}

// ── 1. Single indicators ─────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    for n in [1_000usize, 5_000] {
        let closes = make_closes(n);
        group.bench_with_input(BenchmarkId::new("rsi10", n), &closes, |b, closes| {
            b.iter(|| compute_rsi(black_box(closes), 10))
        });
        group.bench_with_input(BenchmarkId::new("sma200", n), &closes, |b, closes| {
            b.iter(|| compute_sma(black_box(closes), 200))
        });
        group.bench_with_input(BenchmarkId::new("ema20", n), &closes, |b, closes| {
            b.iter(|| compute_ema(black_box(closes), 20))
        });
    }
    group.finish();
}

// ── 2. Frame ─────────────────────────────────────────────────────────

fn bench_frame(c: &mut Criterion) {
    let series = make_series("SPY", 5_000, 0.0);
    let specs = IndicatorSpec::default_set();
    c.bench_function("frame_default_set_5000", |b| {
        b.iter(|| IndicatorFrame::compute(black_box(&series), &specs))
    });
}

// ── 3. Detection ─────────────────────────────────────────────────────

fn bench_detect(c: &mut Criterion) {
    let tickers = ["GLD", "USDU", "XLP", "SPY", "TQQQ"];
    let series: Vec<DailySeries> = tickers
        .iter()
        .enumerate()
        .map(|(k, t)| make_series(t, 5_000, k as f64))
        .collect();
    let frames = FrameSet::compute(&series, &IndicatorSpec::default_set());
    let def = SignalDefinition::parse(
        "triple",
        "GLD.rsi10 > 79 and USDU.rsi10 < 25 and XLP.rsi10 > 65 or SPY.rsi10 > 79",
        "TQQQ",
        Direction::Long,
    )
    .unwrap();
    c.bench_function("detect_5_tickers_5000", |b| {
        b.iter(|| detect(black_box(&def), &frames))
    });
}

criterion_group!(benches, bench_indicators, bench_frame, bench_detect);
criterion_main!(benches);
