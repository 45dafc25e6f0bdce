//! Built-in signal playbook, embedded at compile time.

use serde::Deserialize;

use crate::config::{ConfigError, SignalConfig};

const PLAYBOOK_TOML: &str = include_str!("playbook.toml");

#[derive(Deserialize)]
struct PlaybookFile {
    signals: Vec<SignalConfig>,
}

/// The playbook's signal configs, in file order.
pub fn signals() -> Result<Vec<SignalConfig>, ConfigError> {
    let file: PlaybookFile = toml::from_str(PLAYBOOK_TOML)?;
    Ok(file.signals)
}
