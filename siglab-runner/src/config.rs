//! Analysis configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. Signals are data: `[[signals]]` tables carrying a condition
//! string. Without any, the built-in playbook is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use siglab_core::align::AlignConfig;
use siglab_core::calendar::CalendarSource;
use siglab_core::domain::{Direction, Resolution};
use siglab_core::gap::ZeroGapPolicy;
use siglab_core::indicators::{IndicatorSpec, UnknownIndicator};
use siglab_core::returns::ContributionFallback;
use siglab_core::signals::{ExprError, RegistryError, SignalDefinition, SignalRegistry};
use siglab_core::timing::TimingConfig;
use thiserror::Error;

use crate::playbook;
use crate::snapshot::SnapshotConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("combo '{id}': {source}")]
    Condition {
        id: String,
        #[source]
        source: ExprError,
    },

    #[error("signal '{id}': {source}")]
    Indicator {
        id: String,
        #[source]
        source: UnknownIndicator,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One `[[signals]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Condition string, e.g. `"GLD.rsi10 > 79 and USDU.rsi10 < 25"`.
    pub when: String,
    pub traded: String,
    #[serde(default)]
    pub direction: Direction,
    /// Falls back to [`AnalysisConfig::default_calendar`].
    #[serde(default)]
    pub calendar: Option<CalendarSource>,
}

impl SignalConfig {
    /// Parse the condition and check every referenced indicator key.
    pub fn to_definition(&self, default_calendar: &CalendarSource) -> Result<SignalDefinition, ConfigError> {
        let def = SignalDefinition::parse(&self.id, &self.when, &self.traded, self.direction)?
            .with_description(&self.description)
            .with_calendar(self.calendar.clone().unwrap_or_else(|| default_calendar.clone()));

        for series in def.when.series() {
            series
                .key
                .parse::<IndicatorSpec>()
                .map_err(|source| ConfigError::Indicator {
                    id: self.id.clone(),
                    source,
                })?;
        }
        Ok(def)
    }
}

/// Where the bar tables live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub daily_dir: PathBuf,
    pub intraday_dir: PathBuf,
    /// Ticker -> file stem, for symbols that are not valid file names.
    pub filename_aliases: BTreeMap<String, String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        let filename_aliases = [("BTC-USD", "BTCUSD"), ("X:BTCUSD", "BTCUSD")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            daily_dir: PathBuf::from("data/daily"),
            intraday_dir: PathBuf::from("data/polygon"),
            filename_aliases,
        }
    }
}

impl DataConfig {
    /// Point both stores at one directory.
    pub fn with_root(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.daily_dir = dir.clone();
        self.intraday_dir = dir;
        self
    }
}

/// Which intraday table each report reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageResolutions {
    /// Return decomposition and gap classification.
    pub sessions: Resolution,
    pub timing: Resolution,
    pub hourly: Resolution,
}

impl Default for StageResolutions {
    fn default() -> Self {
        Self {
            sessions: Resolution::FiveMinute,
            timing: Resolution::FiveMinute,
            hourly: Resolution::SixtyMinute,
        }
    }
}

/// Session alignment per table resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub five_minute: AlignConfig,
    pub sixty_minute: AlignConfig,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            five_minute: AlignConfig::for_resolution(Resolution::FiveMinute),
            sixty_minute: AlignConfig::for_resolution(Resolution::SixtyMinute),
        }
    }
}

impl AlignmentConfig {
    pub fn get(&self, resolution: Resolution) -> &AlignConfig {
        match resolution {
            Resolution::FiveMinute => &self.five_minute,
            Resolution::SixtyMinute => &self.sixty_minute,
        }
    }
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    /// Indicator series computed for every ticker, on top of those the
    /// signals reference.
    pub indicators: Vec<IndicatorSpec>,
    pub resolutions: StageResolutions,
    pub alignment: AlignmentConfig,
    /// Holding periods in trading days for the multi-day decomposition.
    pub holding_periods: Vec<usize>,
    pub timing: TimingConfig,
    pub zero_gap: ZeroGapPolicy,
    pub contribution_fallback: ContributionFallback,
    pub default_calendar: CalendarSource,
    pub snapshot: SnapshotConfig,
    pub signals: Vec<SignalConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            indicators: IndicatorSpec::default_set(),
            resolutions: StageResolutions::default(),
            alignment: AlignmentConfig::default(),
            holding_periods: vec![1, 2, 3, 5],
            timing: TimingConfig::default(),
            zero_gap: ZeroGapPolicy::default(),
            contribution_fallback: ContributionFallback::default(),
            default_calendar: CalendarSource::default(),
            snapshot: SnapshotConfig::default(),
            signals: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.holding_periods.iter().any(|&h| h == 0) {
            return Err(ConfigError::Invalid("holding periods must be >= 1 day".into()));
        }
        if self.timing.offsets_minutes.is_empty() {
            return Err(ConfigError::Invalid("timing.offsets_minutes must not be empty".into()));
        }
        for resolution in Resolution::ALL {
            if self.alignment.get(resolution).min_session_bars == 0 {
                return Err(ConfigError::Invalid(format!(
                    "alignment for {resolution}: min_session_bars must be >= 1"
                )));
            }
        }
        self.snapshot.validate()
    }

    /// Signal configs in effect: the configured ones, or the playbook.
    pub fn signal_configs(&self) -> Result<Vec<SignalConfig>, ConfigError> {
        if self.signals.is_empty() {
            playbook::signals()
        } else {
            Ok(self.signals.clone())
        }
    }

    /// Build the registry passed through the pipeline.
    pub fn registry(&self) -> Result<SignalRegistry, ConfigError> {
        let mut registry = SignalRegistry::new();
        for signal in self.signal_configs()? {
            registry.register(signal.to_definition(&self.default_calendar)?)?;
        }
        Ok(registry)
    }

    /// Configured indicators plus every key the registry's conditions use.
    pub fn indicator_specs(&self, registry: &SignalRegistry) -> Vec<IndicatorSpec> {
        let mut specs = self.indicators.clone();
        for def in registry {
            for series in def.when.series() {
                if let Ok(spec) = series.key.parse::<IndicatorSpec>() {
                    if !specs.contains(&spec) {
                        specs.push(spec);
                    }
                }
            }
        }
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.holding_periods, vec![1, 2, 3, 5]);
        assert_eq!(config.zero_gap, ZeroGapPolicy::Up);
        assert_eq!(config.contribution_fallback, ContributionFallback::EvenSplit);
        assert_eq!(config.default_calendar, CalendarSource::Traded);
    }

    #[test]
    fn empty_config_falls_back_to_playbook() {
        let registry = AnalysisConfig::default().registry().unwrap();
        assert!(registry.get("tqqq_double").is_some());
        assert!(registry.len() >= 8);
    }

    #[test]
    fn parses_signals_and_options() {
        let toml = r#"
            holding_periods = [1, 3]
            zero_gap = "down"
            contribution_fallback = "undefined"
            default_calendar = "trigger"

            [data]
            daily_dir = "/tmp/daily"

            [timing]
            offsets_minutes = [0, 15]
            min_samples = 5

            [alignment.five_minute]
            min_session_bars = 10
            close_cutoff = "15:50"

            [[signals]]
            id = "gld_usdu"
            when = "GLD.rsi10 > 79 and USDU.rsi10 < 25"
            traded = "TQQQ"
            calendar = { ticker = "SPY" }

            [[signals]]
            id = "fas_fade"
            when = "FAS.rsi10 > 85"
            traded = "FAS"
            direction = "short"
        "#;
        let config = AnalysisConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.holding_periods, vec![1, 3]);
        assert_eq!(config.zero_gap, ZeroGapPolicy::Down);
        assert_eq!(config.timing.min_samples, 5);
        assert_eq!(config.alignment.five_minute.min_session_bars, 10);
        assert_eq!(config.data.intraday_dir, PathBuf::from("data/polygon"));

        let registry = config.registry().unwrap();
        assert_eq!(registry.ids(), vec!["gld_usdu", "fas_fade"]);
        let gld = registry.get("gld_usdu").unwrap();
        assert_eq!(gld.calendar_ticker(), "SPY");
        let fas = registry.get("fas_fade").unwrap();
        assert_eq!(fas.direction, Direction::Short);
        // default_calendar = trigger
        assert_eq!(fas.calendar, CalendarSource::Trigger);
    }

    #[test]
    fn bad_condition_names_the_signal() {
        let toml = r#"
            [[signals]]
            id = "broken"
            when = "GLD.rsi10 >"
            traded = "TQQQ"
        "#;
        let err = AnalysisConfig::from_toml_str(toml).unwrap().registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registry(RegistryError::Condition { ref id, .. }) if id == "broken"
        ));
        assert!(err.to_string().starts_with("signal 'broken':"));
    }

    #[test]
    fn unknown_indicator_key_is_rejected() {
        let toml = r#"
            [[signals]]
            id = "odd"
            when = "GLD.macd > 0"
            traded = "TQQQ"
        "#;
        let err = AnalysisConfig::from_toml_str(toml).unwrap().registry().unwrap_err();
        assert!(matches!(err, ConfigError::Indicator { .. }));
    }

    #[test]
    fn zero_holding_period_is_invalid() {
        let err = AnalysisConfig::from_toml_str("holding_periods = [0]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn referenced_keys_extend_indicator_set() {
        let config = AnalysisConfig {
            indicators: vec![IndicatorSpec::Close],
            signals: vec![SignalConfig {
                id: "rsi14".into(),
                description: String::new(),
                when: "SPY.rsi14 < 30".into(),
                traded: "SPY".into(),
                direction: Direction::Long,
                calendar: None,
            }],
            ..AnalysisConfig::default()
        };
        let registry = config.registry().unwrap();
        let specs = config.indicator_specs(&registry);
        assert_eq!(specs, vec![IndicatorSpec::Close, IndicatorSpec::Rsi(14)]);
    }
}
