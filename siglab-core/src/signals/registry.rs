//! Signal registry — explicit, caller-owned collection of signal definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::expr::{ExprError, SignalExpr};
use crate::calendar::CalendarSource;
use crate::domain::Direction;

/// An immutable, named condition plus how to trade it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub when: SignalExpr,
    /// Ticker whose sessions are analysed on each trade date.
    pub traded: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub calendar: CalendarSource,
}

impl SignalDefinition {
    /// Build a definition from a condition string.
    pub fn parse(
        id: impl Into<String>,
        when: &str,
        traded: impl Into<String>,
        direction: Direction,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        let when = when
            .parse()
            .map_err(|source| RegistryError::Condition { id: id.clone(), source })?;
        Ok(Self {
            id,
            description: String::new(),
            when,
            traded: traded.into(),
            direction,
            calendar: CalendarSource::default(),
        })
    }

    pub fn with_calendar(mut self, calendar: CalendarSource) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// First ticker referenced by the condition.
    pub fn trigger_ticker(&self) -> Option<String> {
        self.when.tickers().into_iter().next()
    }

    /// Ticker whose date index resolves trade dates.
    pub fn calendar_ticker(&self) -> String {
        let trigger = self.trigger_ticker();
        self.calendar
            .ticker(trigger.as_deref(), &self.traded)
            .to_string()
    }

    /// Every ticker this signal needs daily data for, deduplicated, in order.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers = self.when.tickers();
        for extra in [self.traded.clone(), self.calendar_ticker()] {
            if !tickers.contains(&extra) {
                tickers.push(extra);
            }
        }
        tickers
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("signal id must not be empty")]
    EmptyId,
    #[error("duplicate signal id '{0}'")]
    DuplicateId(String),
    #[error("signal '{id}': traded ticker must not be empty")]
    NoTradedTicker { id: String },
    #[error("signal '{id}': {source}")]
    Condition {
        id: String,
        #[source]
        source: ExprError,
    },
}

/// Ordered registry of signal definitions, keyed by unique id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalRegistry {
    signals: Vec<SignalDefinition>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Ids are unique; registration order is preserved.
    pub fn register(&mut self, def: SignalDefinition) -> Result<(), RegistryError> {
        if def.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if def.traded.trim().is_empty() {
            return Err(RegistryError::NoTradedTicker { id: def.id });
        }
        if self.get(&def.id).is_some() {
            return Err(RegistryError::DuplicateId(def.id));
        }
        self.signals.push(def);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalDefinition> {
        self.signals.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.signals.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Union of tickers needed by all signals, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let mut all: Vec<String> = self.signals.iter().flat_map(|s| s.tickers()).collect();
        all.sort();
        all.dedup();
        all
    }
}

impl<'a> IntoIterator for &'a SignalRegistry {
    type Item = &'a SignalDefinition;
    type IntoIter = std::slice::Iter<'a, SignalDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.signals.iter()
    }
}
