//! Plain-text rendering of analyses, availability checks and snapshots.
//!
//! Returns are stored as fractions and printed as percents.

use siglab_core::domain::clock;
use siglab_core::returns::DayTradeVerdict;
use siglab_core::signals::SignalRegistry;

use crate::check::AvailabilityReport;
use crate::pipeline::SignalAnalysis;
use crate::snapshot::Snapshot;

const RULE: usize = 70;

fn banner(report: &mut String, title: &str) {
    report.push_str(&format!("\n{}\n{}\n{}\n", "=".repeat(RULE), title, "=".repeat(RULE)));
}

fn pct(v: f64) -> String {
    format!("{:+.3}%", v * 100.0)
}

/// Full text report for one signal.
pub fn render_analysis(a: &SignalAnalysis) -> String {
    let mut report = format!(
        "\n{hash}\n# SIGNAL: {}\n# {}\n# {} {} | calendar: {}\n{hash}\n",
        a.id,
        a.description,
        a.direction.as_str().to_uppercase(),
        a.traded,
        a.calendar_ticker,
        hash = "#".repeat(RULE),
    );

    if !a.missing.is_empty() {
        report.push_str(&format!("\n  Missing daily data: {}\n", a.missing.join(", ")));
    }
    if a.triggers.is_empty() {
        report.push_str("\n  No signal dates found.\n");
        return report;
    }
    report.push_str(&format!("\n  Signal dates: {}", a.triggers.len()));
    if let (Some(first), Some(last)) = (a.triggers.first(), a.triggers.last()) {
        report.push_str(&format!(" ({first} to {last})"));
    }
    report.push_str(&format!("\n  Trade dates: {}\n", a.trades.len()));
    if !a.calendar_dropped.is_empty() {
        let dates: Vec<String> = a.calendar_dropped.iter().map(|d| d.to_string()).collect();
        report.push_str(&format!("  No next session yet: {}\n", dates.join(", ")));
    }
    for c in &a.coverage {
        if !c.table {
            report.push_str(&format!("  No {} data for {}\n", c.resolution, a.traded));
        } else if !c.dropped.is_empty() {
            report.push_str(&format!(
                "  {}: {} aligned, {} dropped\n",
                c.resolution,
                c.aligned,
                c.dropped.len()
            ));
        }
    }

    render_decomposition(&mut report, a);
    render_gaps(&mut report, a);
    render_timing(&mut report, a);
    render_hourly(&mut report, a);
    report
}

fn render_decomposition(report: &mut String, a: &SignalAnalysis) {
    banner(report, &format!("OVERNIGHT vs INTRADAY: {} on [{}]", a.traded, a.id));
    let s = &a.summary;
    if s.count == 0 {
        report.push_str("  No matching dates with complete data.\n");
    } else {
        let contrib = |c: Option<f64>| c.map_or_else(|| "n/a".to_string(), |v| format!("{v:.0}%"));
        report.push_str(&format!("\n  Signal days with data: {}\n\n", s.count));
        report.push_str(&format!(
            "  {:<15} {:>10} {:>8} {:>14}\n  {}\n",
            "Component",
            "Avg Ret%",
            "Win%",
            "Contribution",
            "-".repeat(50)
        ));
        for (name, stats, c) in [
            ("Overnight", s.overnight, contrib(s.overnight_contribution)),
            ("Intraday", s.intraday, contrib(s.intraday_contribution)),
            ("TOTAL", s.total, String::new()),
        ] {
            report.push_str(&format!(
                "  {:<15} {:>10} {:>7.0}% {:>14}\n",
                name,
                pct(stats.mean),
                stats.win_rate * 100.0,
                c
            ));
        }

        if let (Some(verdict), Some(id)) = (a.verdict, s.intraday_contribution) {
            let detail = match verdict {
                DayTradeVerdict::Good => format!("{id:.0}% of edge is intraday"),
                DayTradeVerdict::Mixed => format!(
                    "{id:.0}% intraday, {:.0}% overnight",
                    s.overnight_contribution.unwrap_or(100.0 - id)
                ),
                DayTradeVerdict::NotDayTradeable => format!("only {id:.0}% intraday"),
            };
            report.push_str(&format!("\n  DAY TRADE VERDICT: {} ({detail})\n", verdict.label()));
        }
    }

    if !a.holding.is_empty() {
        report.push_str("\n  Multi-day decomposition (cumulative):\n");
        report.push_str(&format!(
            "  {:<6} {:>12} {:>12} {:>10} {:>12} {:>6}\n  {}\n",
            "Days",
            "Overnight%",
            "Intraday%",
            "Total%",
            "ID Contrib",
            "n",
            "-".repeat(62)
        ));
        for h in &a.holding {
            let id_contrib = if h.count > 0 && h.total.mean != 0.0 {
                format!("{:.0}%", h.intraday.mean / h.total.mean * 100.0)
            } else {
                "n/a".to_string()
            };
            report.push_str(&format!(
                "  {:<6} {:>12} {:>12} {:>10} {:>12} {:>6}\n",
                h.days,
                pct(h.overnight.mean),
                pct(h.intraday.mean),
                pct(h.total.mean),
                id_contrib,
                h.count
            ));
        }
    }
}

fn render_gaps(report: &mut String, a: &SignalAnalysis) {
    banner(report, &format!("GAP PATTERN ANALYSIS: {} on [{}]", a.traded, a.id));
    let g = &a.gaps;
    if g.total == 0 {
        report.push_str("  No pattern data.\n");
        return;
    }
    report.push_str(&format!("\n  Signal days analyzed: {}\n\n", g.total));
    report.push_str(&format!(
        "  {:<26} {:>6} {:>6} {:>10} {:>10} {:>10}\n  {}\n",
        "Pattern",
        "Count",
        "%",
        "Avg Gap",
        "Avg ID",
        "Avg Total",
        "-".repeat(73)
    ));
    for p in g.patterns.iter().filter(|p| p.count > 0) {
        report.push_str(&format!(
            "  {:<26} {:>6} {:>5.0}% {:>10} {:>10} {:>10}\n",
            p.pattern.label(),
            p.count,
            p.frequency * 100.0,
            pct(p.mean_overnight),
            pct(p.mean_intraday),
            pct(p.mean_total)
        ));
    }
    if let Some(primary) = g.primary().filter(|p| p.count > 0) {
        report.push_str(&format!(
            "\n  Primary day-trade setup: {}\n    Frequency: {}/{} ({:.0}%)\n    Avg intraday return: {}\n",
            primary.pattern,
            primary.count,
            g.total,
            primary.frequency * 100.0,
            pct(primary.mean_intraday)
        ));
    }
}

fn render_timing(report: &mut String, a: &SignalAnalysis) {
    banner(report, &format!("ENTRY TIMING: {} on [{}]", a.traded, a.id));
    let t = &a.timing;
    if t.ranked.is_empty() {
        report.push_str("  No entry time has enough samples.\n");
        return;
    }
    report.push_str(&format!(
        "\n  {:<12} {:>8} {:>10} {:>8} {:>6}\n  {}\n",
        "Entry",
        "Time",
        "Avg Ret%",
        "Win%",
        "n",
        "-".repeat(48)
    ));
    for r in &t.ranked {
        report.push_str(&format!(
            "  {:<12} {:>8} {:>10} {:>7.0}% {:>6}\n",
            r.label,
            clock::label(r.time),
            pct(r.mean_return),
            r.win_rate * 100.0,
            r.samples
        ));
    }
    if !t.insufficient.is_empty() {
        report.push_str(&format!("  Too few samples: {}\n", t.insufficient.join(", ")));
    }
    if let Some(best) = t.optimal() {
        report.push_str(&format!("\n  Best entry: {} ({} avg)\n", best.label, pct(best.mean_return)));
    }
}

fn render_hourly(report: &mut String, a: &SignalAnalysis) {
    banner(report, &format!("HOURLY RETURN PROFILE: {} on [{}]", a.traded, a.id));
    let h = &a.hourly;
    if h.buckets.is_empty() {
        report.push_str("  No valid trading days found.\n");
        return;
    }
    report.push_str(&format!("\n  Matching days with intraday data: {}\n\n", h.sessions));
    report.push_str(&format!(
        "  {:<8} {:>10} {:>8} {:>10} {:>12} {:>6}\n  {}\n",
        "Hour",
        "Bar Ret%",
        "Win%",
        "Cum Ret%",
        "Avg Vol",
        "Days",
        "-".repeat(58)
    ));
    for b in &h.buckets {
        report.push_str(&format!(
            "  {:<8} {:>10} {:>7.0}% {:>10} {:>12.0} {:>6}\n",
            b.label,
            pct(b.mean_return),
            b.win_rate * 100.0,
            pct(b.mean_cumulative),
            b.mean_volume,
            b.days
        ));
    }
    if let Some(best) = h.best() {
        report.push_str(&format!("\n  Best hour: {} ({} avg)\n", best.label, pct(best.mean_return)));
    }
    if let Some(cmp) = h.opening_comparison() {
        let rest = cmp.rest_mean.map_or_else(|| "n/a".to_string(), pct);
        report.push_str(&format!(
            "  First bar ({}): {} | Rest of day avg: {}\n",
            cmp.first_label,
            pct(cmp.first_mean),
            rest
        ));
    }
}

/// One line per registered signal.
pub fn render_signal_list(registry: &SignalRegistry) -> String {
    let mut report = String::from("Available signals:\n");
    for def in registry {
        report.push_str(&format!(
            "  {:<20} {:<6} {:<5} {}\n",
            def.id,
            def.traded,
            def.direction.as_str(),
            if def.description.is_empty() {
                def.when.to_string()
            } else {
                def.description.clone()
            }
        ));
    }
    report
}

pub fn render_availability(r: &AvailabilityReport) -> String {
    let mut report = String::from("\nDaily data:\n");
    for t in &r.tickers {
        let status = match &t.daily {
            Some(s) => format!(
                "{:>6} days  ({} -> {})",
                s.bars,
                s.first.map(|d| d.to_string()).unwrap_or_default(),
                s.last.map(|d| d.to_string()).unwrap_or_default()
            ),
            None => "MISSING".to_string(),
        };
        report.push_str(&format!("  {:<8} {}\n", t.ticker, status));
    }
    report.push_str("\nIntraday data:\n");
    for t in &r.tickers {
        for (resolution, span) in &t.intraday {
            let status = match span {
                Some(s) => format!(
                    "{:>10} bars {:>6} sessions  ({} -> {})",
                    s.bars,
                    s.days,
                    s.first.map(|d| d.to_string()).unwrap_or_default(),
                    s.last.map(|d| d.to_string()).unwrap_or_default()
                ),
                None => format!("{:>10}", "MISSING"),
            };
            report.push_str(&format!("  {:<8} {:<6} {}\n", t.ticker, resolution.label(), status));
        }
    }
    if !r.missing.is_empty() {
        let names: Vec<String> = r.missing.iter().map(|m| m.to_string()).collect();
        report.push_str(&format!("\nMissing: {}\n", names.join(", ")));
    }
    report
}

pub fn render_snapshot_summary(s: &Snapshot) -> String {
    let mut report = String::new();
    banner(&mut report, &format!("SNAPSHOT SUMMARY - {}", s.meta.generated_et));
    if s.signals.active_alerts.is_empty() {
        report.push_str("  No active signals\n");
    } else {
        for alert in &s.signals.active_alerts {
            report.push_str(&format!("  {alert}\n"));
        }
    }
    report.push_str("\n  Playbook conditions:\n");
    for (name, state) in &s.signals.playbook {
        let mark = if state.active { "*" } else { "o" };
        let value = state.value.map_or_else(|| "n/a".to_string(), |v| format!("{v}"));
        report.push_str(&format!("    {mark} {name}: {value}\n"));
    }
    let bm = &s.signals.bond_momentum;
    report.push_str(&format!(
        "\n  Bond momentum: {:?} (10d: {})\n  UVXY conviction: {}\n",
        bm.direction,
        bm.primary_ret_10d.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.2}%")),
        bm.uvxy_conviction.map_or_else(|| "n/a".to_string(), |c| format!("{c:?}"))
    ));
    report.push_str(&format!("  Tickers: {}\n", s.meta.ticker_count));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use siglab_core::calendar::CalendarSource;
    use siglab_core::domain::Direction;
    use siglab_core::signals::SignalDefinition;

    #[test]
    fn signal_list_prefers_description() {
        let mut registry = SignalRegistry::new();
        registry
            .register(
                SignalDefinition::parse("a", "SPY.rsi10 > 79", "UPRO", Direction::Short)
                    .unwrap()
                    .with_calendar(CalendarSource::Trigger),
            )
            .unwrap();
        registry
            .register(
                SignalDefinition::parse("b", "QQQ.rsi10 < 21", "TQQQ", Direction::Long)
                    .unwrap()
                    .with_description("QQQ oversold"),
            )
            .unwrap();
        let text = render_signal_list(&registry);
        assert!(text.contains("short"));
        assert!(text.contains("QQQ oversold"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("a ") && l.contains("SPY.rsi10")));
    }

    #[test]
    fn pct_formats_fractions() {
        assert_eq!(pct(0.0123), "+1.230%");
        assert_eq!(pct(-0.005), "-0.500%");
    }
}
