//! siglab runner — everything between the pure core and the binary.
//!
//! This crate builds on `siglab-core` to provide:
//! - TOML configuration with every field defaulted, and the built-in playbook
//! - Bar stores (CSV on disk, in memory)
//! - Pipeline orchestration with per-signal isolation and run fingerprints
//! - Data-availability check
//! - Latest-value snapshot of the indicator state
//! - Plain-text report rendering

pub mod check;
pub mod config;
pub mod pipeline;
pub mod playbook;
pub mod report;
pub mod snapshot;
pub mod store;

pub use check::{check, AvailabilityReport, MissingTable, TableSpan, TickerAvailability};
pub use config::{AlignmentConfig, AnalysisConfig, ConfigError, DataConfig, SignalConfig, StageResolutions};
pub use pipeline::{MarketData, Pipeline, SessionCoverage, SignalAnalysis};
pub use snapshot::{Snapshot, SnapshotConfig, SnapshotSignals, TickerIndicators};
pub use store::{CsvStore, DailyBarStore, IntradayBarStore, MemoryStore, StoreError};
