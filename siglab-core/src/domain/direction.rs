//! Trade direction of a signal.

use serde::{Deserialize, Serialize};

/// Whether a signal is read as a long or a short setup.
///
/// Direction is applied to return figures only; prices are never negated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Long,
    Short,
}

impl Direction {
    /// Express a raw price return from this direction's point of view.
    pub fn apply(self, raw_return: f64) -> f64 {
        match self {
            Direction::Long => raw_return,
            Direction::Short => -raw_return,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_negates() {
        assert_eq!(Direction::Long.apply(0.02), 0.02);
        assert_eq!(Direction::Short.apply(0.02), -0.02);
    }

    #[test]
    fn parses_lowercase() {
        let d: Direction = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(d, Direction::Short);
    }
}
