//! siglab CLI — list, check and analyze signals, and write snapshots.
//!
//! Modes (exactly one):
//! - `--list` — registered signals
//! - `--check` — data availability for every referenced ticker
//! - `--signal ID` / `--all` — overnight vs intraday analysis
//! - `--snapshot PATH` — latest indicator state and playbook checks as JSON
//!
//! Report text goes to stdout, logs to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgGroup, Parser};
use siglab_core::indicators::FrameSet;
use siglab_runner::report::{render_analysis, render_availability, render_signal_list, render_snapshot_summary};
use siglab_runner::{check, AnalysisConfig, CsvStore, DailyBarStore, Pipeline, Snapshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "siglab",
    about = "siglab — overnight vs intraday analysis of RSI signal playbooks"
)]
#[command(group(ArgGroup::new("mode").required(true).args(["list", "check", "signal", "all", "snapshot"])))]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding both daily and intraday tables (overrides config).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// List registered signals.
    #[arg(long)]
    list: bool,

    /// Report data availability for every referenced ticker.
    #[arg(long)]
    check: bool,

    /// Analyze one signal by id.
    #[arg(long, value_name = "ID")]
    signal: Option<String>,

    /// Analyze every registered signal.
    #[arg(long)]
    all: bool,

    /// Write a snapshot JSON to this path.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// With --snapshot: keep only key tickers in `indicators`.
    #[arg(long, requires = "snapshot")]
    compact: bool,

    /// Print JSON instead of report text.
    #[arg(long)]
    json: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data = config.data.with_root(dir);
    }
    let registry = config.registry()?;
    let store = CsvStore::from_config(&config.data);

    if cli.list {
        print!("{}", render_signal_list(&registry));
        return Ok(());
    }

    if cli.check {
        let report = check(&registry, &store);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render_availability(&report));
        }
        return Ok(());
    }

    if let Some(path) = &cli.snapshot {
        return run_snapshot(&config, &store, path, cli.compact, cli.json);
    }

    if let Some(id) = &cli.signal {
        if registry.get(id).is_none() {
            bail!("unknown signal '{id}'; available: {}", registry.ids().join(", "));
        }
    }

    let pipeline = Pipeline::new(config, registry, &store);
    let analyses = match &cli.signal {
        Some(id) => pipeline.analyze(id).into_iter().collect(),
        None => pipeline.analyze_all(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
    } else {
        for analysis in &analyses {
            print!("{}", render_analysis(analysis));
        }
    }
    for analysis in &analyses {
        let fingerprint = analysis.fingerprint()?;
        info!(signal = %analysis.id, %fingerprint, "run fingerprint");
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "siglab=debug" } else { "siglab=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_snapshot(config: &AnalysisConfig, store: &CsvStore, path: &Path, compact: bool, json: bool) -> Result<()> {
    let snap_config = &config.snapshot;
    let tickers = snap_config.required_tickers()?;
    let specs = snap_config.indicator_specs()?;

    let dailies: Vec<_> = tickers
        .iter()
        .filter_map(|t| {
            let series = store.load_daily(t);
            if series.is_none() {
                warn!(ticker = %t, "no daily table for snapshot");
            }
            series
        })
        .collect();
    info!(requested = tickers.len(), loaded = dailies.len(), "snapshot tables loaded");

    let frames = FrameSet::compute(&dailies, &specs);
    let mut snapshot = Snapshot::build(&frames, snap_config, Utc::now())?;
    if compact {
        snapshot = snapshot.compact(snap_config);
    }

    let body = serde_json::to_string_pretty(&snapshot)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, &body).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), bytes = body.len(), "snapshot written");

    if json {
        println!("{body}");
    } else {
        print!("{}", render_snapshot_summary(&snapshot));
    }
    Ok(())
}
