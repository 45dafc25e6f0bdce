//! Signal condition expressions.
//!
//! A condition is a small tagged tree of `And` / `Or` / `Compare` nodes over
//! named indicator series (`TICKER.key`). Conditions are written as text in
//! configuration and parsed here:
//!
//! ```text
//! GLD.rsi10 > 79 and USDU.rsi10 < 25
//! (XLP.rsi10 > 75 or XLU.rsi10 > 75) and SPY.close > SPY.sma200
//! ```
//!
//! Grammar: `expr := and ('or' and)*`, `and := atom ('and' atom)*`,
//! `atom := '(' expr ')' | operand cmp operand`, `operand := TICKER.key | number`.
//! Keywords are case-insensitive.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::IndicatorSpec;

/// Reference to one indicator series of one ticker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesRef {
    pub ticker: String,
    pub key: String,
}

impl SeriesRef {
    pub fn new(ticker: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SeriesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ticker, self.key)
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Series(SeriesRef),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Series(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Comparison {
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// Predicate tree over named indicator series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SignalExpr {
    And { all: Vec<SignalExpr> },
    Or { any: Vec<SignalExpr> },
    Compare {
        left: Operand,
        cmp: Comparison,
        right: Operand,
    },
}

impl SignalExpr {
    /// Shorthand for `TICKER.key <cmp> value`.
    pub fn compare(ticker: &str, key: &str, cmp: Comparison, value: f64) -> Self {
        SignalExpr::Compare {
            left: Operand::Series(SeriesRef::new(ticker, key)),
            cmp,
            right: Operand::Value(value),
        }
    }

    /// Evaluate against a lookup. An undefined operand makes the comparison false.
    pub fn evaluate<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&SeriesRef) -> Option<f64>,
    {
        match self {
            SignalExpr::And { all } => all.iter().all(|e| e.evaluate(lookup)),
            SignalExpr::Or { any } => any.iter().any(|e| e.evaluate(lookup)),
            SignalExpr::Compare { left, cmp, right } => {
                let resolve = |op: &Operand| match op {
                    Operand::Value(v) => Some(*v),
                    Operand::Series(s) => lookup(s),
                };
                match (resolve(left), resolve(right)) {
                    (Some(l), Some(r)) => cmp.holds(l, r),
                    _ => false,
                }
            }
        }
    }

    /// Every series referenced by the tree.
    pub fn series(&self) -> BTreeSet<SeriesRef> {
        let mut out = BTreeSet::new();
        self.collect_series(&mut out);
        out
    }

    /// Tickers in first-reference order, deduplicated.
    pub fn tickers(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.collect_in_order(&mut refs);
        let mut tickers: Vec<String> = Vec::new();
        for r in refs {
            if !tickers.contains(&r.ticker) {
                tickers.push(r.ticker);
            }
        }
        tickers
    }

    fn collect_series(&self, out: &mut BTreeSet<SeriesRef>) {
        let mut refs = Vec::new();
        self.collect_in_order(&mut refs);
        out.extend(refs);
    }

    fn collect_in_order(&self, out: &mut Vec<SeriesRef>) {
        match self {
            SignalExpr::And { all: items } | SignalExpr::Or { any: items } => {
                for e in items {
                    e.collect_in_order(out);
                }
            }
            SignalExpr::Compare { left, right, .. } => {
                for op in [left, right] {
                    if let Operand::Series(s) = op {
                        out.push(s.clone());
                    }
                }
            }
        }
    }
}

impl fmt::Display for SignalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[SignalExpr], word: &str) -> fmt::Result {
            for (i, e) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {word} ")?;
                }
                match e {
                    SignalExpr::Compare { .. } => write!(f, "{e}")?,
                    _ => write!(f, "({e})")?,
                }
            }
            Ok(())
        }
        match self {
            SignalExpr::And { all } => join(f, all, "and"),
            SignalExpr::Or { any } => join(f, any, "or"),
            SignalExpr::Compare { left, cmp, right } => {
                write!(f, "{left} {} {right}", cmp.symbol())
            }
        }
    }
}

/// Errors from parsing a condition string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty condition")]
    Empty,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: String, offset: usize },
    #[error("unexpected end of condition, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("invalid operand '{0}': expected TICKER.indicator or a number")]
    InvalidOperand(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Cmp(Comparison),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push((Token::Open, offset));
                i += 1;
            }
            ')' => {
                tokens.push((Token::Close, offset));
                i += 1;
            }
            '<' | '>' => {
                let eq = matches!(chars.get(i + 1), Some((_, '=')));
                let cmp = match (c, eq) {
                    ('>', false) => Comparison::Gt,
                    ('>', true) => Comparison::Ge,
                    ('<', false) => Comparison::Lt,
                    _ => Comparison::Le,
                };
                tokens.push((Token::Cmp(cmp), offset));
                i += if eq { 2 } else { 1 };
            }
            '=' | '!' => {
                return Err(ExprError::Unexpected {
                    found: c.to_string(),
                    offset,
                })
            }
            _ => {
                let start = i;
                while i < chars.len() {
                    let ch = chars[i].1;
                    if ch.is_whitespace() || matches!(ch, '(' | ')' | '<' | '>' | '=' | '!') {
                        break;
                    }
                    i += 1;
                }
                let word: String = chars[start..i].iter().map(|(_, ch)| *ch).collect();
                tokens.push((Token::Word(word), offset));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(kw))
    }

    fn parse_or(&mut self) -> Result<SignalExpr, ExprError> {
        let mut items = vec![self.parse_and()?];
        while self.is_keyword("or") {
            self.pos += 1;
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            SignalExpr::Or { any: items }
        })
    }

    fn parse_and(&mut self) -> Result<SignalExpr, ExprError> {
        let mut items = vec![self.parse_atom()?];
        while self.is_keyword("and") {
            self.pos += 1;
            items.push(self.parse_atom()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            SignalExpr::And { all: items }
        })
    }

    fn parse_atom(&mut self) -> Result<SignalExpr, ExprError> {
        if matches!(self.peek(), Some(Token::Open)) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.next() {
                Some((Token::Close, _)) => Ok(inner),
                Some((t, offset)) => Err(unexpected(&t, offset)),
                None => Err(ExprError::UnexpectedEnd { expected: "')'" }),
            };
        }
        let left = self.parse_operand()?;
        let cmp = match self.next() {
            Some((Token::Cmp(c), _)) => c,
            Some((t, offset)) => return Err(unexpected(&t, offset)),
            None => return Err(ExprError::UnexpectedEnd { expected: "comparison" }),
        };
        let right = self.parse_operand()?;
        Ok(SignalExpr::Compare { left, cmp, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, ExprError> {
        match self.next() {
            Some((Token::Word(w), _)) => parse_operand_word(&w),
            Some((t, offset)) => Err(unexpected(&t, offset)),
            None => Err(ExprError::UnexpectedEnd { expected: "operand" }),
        }
    }
}

fn unexpected(token: &Token, offset: usize) -> ExprError {
    let found = match token {
        Token::Word(w) => w.clone(),
        Token::Cmp(c) => c.symbol().to_string(),
        Token::Open => "(".into(),
        Token::Close => ")".into(),
    };
    ExprError::Unexpected { found, offset }
}

fn parse_operand_word(word: &str) -> Result<Operand, ExprError> {
    if let Ok(v) = word.parse::<f64>() {
        if v.is_finite() {
            return Ok(Operand::Value(v));
        }
    }
    // Tickers may contain dots or dashes (BRK.B, BTC-USD); the key is after the last dot.
    match word.rsplit_once('.') {
        Some((ticker, key)) if !ticker.is_empty() && !key.is_empty() => Ok(Operand::Series(
            SeriesRef::new(ticker.to_ascii_uppercase(), canonical_key(key)),
        )),
        _ => Err(ExprError::InvalidOperand(word.to_string())),
    }
}

/// Frames store series under `IndicatorSpec`'s display form, so accepted
/// spellings (`price`, `RSI010`) are rewritten to it. Unknown keys are kept
/// lower-cased for configuration to reject.
fn canonical_key(key: &str) -> String {
    key.parse::<IndicatorSpec>()
        .map(|spec| spec.to_string())
        .unwrap_or_else(|_| key.to_ascii_lowercase())
}

impl FromStr for SignalExpr {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.next() {
            None => Ok(expr),
            Some((t, offset)) => Err(unexpected(&t, offset)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(values: &[(&str, &str, f64)]) -> impl Fn(&SeriesRef) -> Option<f64> {
        let map: HashMap<SeriesRef, f64> = values
            .iter()
            .map(|(t, k, v)| (SeriesRef::new(*t, *k), *v))
            .collect();
        move |r: &SeriesRef| map.get(r).copied()
    }

    #[test]
    fn parses_conjunction() {
        let expr: SignalExpr = "GLD.rsi10 > 79 and USDU.rsi10 < 25".parse().unwrap();
        assert_eq!(
            expr,
            SignalExpr::And {
                all: vec![
                    SignalExpr::compare("GLD", "rsi10", Comparison::Gt, 79.0),
                    SignalExpr::compare("USDU", "rsi10", Comparison::Lt, 25.0),
                ]
            }
        );
        assert_eq!(expr.tickers(), vec!["GLD".to_string(), "USDU".to_string()]);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr: SignalExpr = "A.rsi10 > 1 or B.rsi10 > 2 AND C.rsi10 > 3".parse().unwrap();
        match expr {
            SignalExpr::Or { any } => {
                assert_eq!(any.len(), 2);
                assert!(matches!(any[1], SignalExpr::And { .. }));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_and_series_operands() {
        let expr: SignalExpr = "(XLP.rsi10 >= 75) and spy.close > SPY.sma200".parse().unwrap();
        let series = expr.series();
        assert!(series.contains(&SeriesRef::new("SPY", "close")));
        assert!(series.contains(&SeriesRef::new("SPY", "sma200")));
        assert_eq!(expr.tickers(), vec!["XLP".to_string(), "SPY".to_string()]);
    }

    #[test]
    fn keys_are_stored_in_frame_spelling() {
        let expr: SignalExpr = "GLD.price > 0 and GLD.RSI010 >= 0 or SPY.Vs_Sma200 > 1".parse().unwrap();
        let series = expr.series();
        assert!(series.contains(&SeriesRef::new("GLD", "close")));
        assert!(series.contains(&SeriesRef::new("GLD", "rsi10")));
        assert!(series.contains(&SeriesRef::new("SPY", "vs_sma200")));
        // Unknown keys pass through for configuration to report.
        let expr: SignalExpr = "GLD.Volume > 0".parse().unwrap();
        assert!(expr.series().contains(&SeriesRef::new("GLD", "volume")));
    }

    #[test]
    fn dashed_tickers_and_negative_numbers() {
        let expr: SignalExpr = "BTC-USD.ret5d < -10".parse().unwrap();
        assert_eq!(
            expr,
            SignalExpr::compare("BTC-USD", "ret5d", Comparison::Lt, -10.0)
        );
    }

    #[test]
    fn evaluation_treats_undefined_as_false() {
        let expr: SignalExpr = "A.rsi10 > 70 or B.rsi10 < 30".parse().unwrap();
        let lookup = lookup_from(&[("B", "rsi10", 20.0)]);
        assert!(expr.evaluate(&lookup));
        let expr: SignalExpr = "A.rsi10 > 70 and B.rsi10 < 30".parse().unwrap();
        assert!(!expr.evaluate(&lookup));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<SignalExpr>(), Err(ExprError::Empty));
        assert!(matches!(
            "GLD.rsi10 > ".parse::<SignalExpr>(),
            Err(ExprError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            "GLD > 79".parse::<SignalExpr>(),
            Err(ExprError::InvalidOperand(_))
        ));
        assert!(matches!(
            "GLD.rsi10 == 79".parse::<SignalExpr>(),
            Err(ExprError::Unexpected { .. })
        ));
        assert!(matches!(
            "(GLD.rsi10 > 79".parse::<SignalExpr>(),
            Err(ExprError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn display_reparses_to_same_tree() {
        let expr: SignalExpr = "(A.rsi10 > 1 or B.rsi10 > 2) and C.close <= C.sma50"
            .parse()
            .unwrap();
        let again: SignalExpr = expr.to_string().parse().unwrap();
        assert_eq!(expr, again);
    }
}
