//! Buy/sell thresholds and the signals they produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AutotraderError;

const EPSILON: f64 = 1e-9;

/// Comparison applied as `indicator_value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparison {
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Eq => (lhs - rhs).abs() < EPSILON,
            Comparison::Ne => (lhs - rhs).abs() >= EPSILON,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

impl FromStr for Comparison {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            ">" | "gt" => Ok(Comparison::Gt),
            ">=" | "ge" => Ok(Comparison::Ge),
            "<" | "lt" => Ok(Comparison::Lt),
            "<=" | "le" => Ok(Comparison::Le),
            "==" | "=" | "eq" => Ok(Comparison::Eq),
            "!=" | "ne" => Ok(Comparison::Ne),
            other => Err(AutotraderError::ConfigInvalid {
                section: "signals".into(),
                key: "operator".into(),
                reason: format!("unknown comparison operator '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThreshold {
    pub buy: f64,
    pub sell: f64,
    pub buy_operator: Comparison,
    pub sell_operator: Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Buy => f.write_str("buy"),
            SignalAction::Sell => f.write_str("sell"),
        }
    }
}

/// A threshold hit on the latest row of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub indicator: String,
    pub value: f64,
    pub close: f64,
    pub action: SignalAction,
}
