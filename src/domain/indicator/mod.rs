//! Technical indicators applied as columns on a [`StockFrame`].
//!
//! - `IndicatorKind`: indicator identity + parameters, replayed on refresh
//! - `Indicators`: registry of applied indicators and their buy/sell thresholds
//!
//! Every calculation runs independently per symbol group.

pub mod change;
pub mod ema;
pub mod rsi;
pub mod sma;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::domain::error::AutotraderError;
use crate::domain::signal::{Comparison, Signal, SignalThreshold};
use crate::domain::stock_frame::StockFrame;

pub const CHANGE_IN_PRICE: &str = "change_in_price";
pub const RSI: &str = "rsi";
pub const SMA: &str = "sma";
pub const EMA: &str = "ema";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RsiMethod {
    #[default]
    Wilders,
    Ewma,
}

impl FromStr for RsiMethod {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wilders" | "wilder" => Ok(RsiMethod::Wilders),
            "ewma" | "ema" => Ok(RsiMethod::Ewma),
            other => Err(AutotraderError::ConfigInvalid {
                section: "indicators".into(),
                key: "rsi_method".into(),
                reason: format!("unknown RSI method '{other}' (expected wilders or ewma)"),
            }),
        }
    }
}

impl fmt::Display for RsiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiMethod::Wilders => f.write_str("wilders"),
            RsiMethod::Ewma => f.write_str("ewma"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorKind {
    ChangeInPrice,
    Rsi { period: usize, method: RsiMethod },
    Sma { period: usize },
    /// `alpha == 0.0` means the span default `2/(period+1)`.
    Ema { period: usize, alpha: f64 },
}

impl IndicatorKind {
    pub fn column(&self) -> &'static str {
        match self {
            IndicatorKind::ChangeInPrice => CHANGE_IN_PRICE,
            IndicatorKind::Rsi { .. } => RSI,
            IndicatorKind::Sma { .. } => SMA,
            IndicatorKind::Ema { .. } => EMA,
        }
    }

    pub fn validate(&self) -> Result<(), AutotraderError> {
        let invalid = |reason: String| AutotraderError::ConfigInvalid {
            section: "indicators".into(),
            key: self.column().into(),
            reason,
        };
        match *self {
            IndicatorKind::ChangeInPrice => Ok(()),
            IndicatorKind::Rsi { period, .. }
            | IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period, alpha: _ }
                if period == 0 =>
            {
                Err(invalid("period must be at least 1".into()))
            }
            IndicatorKind::Ema { alpha, .. } if !(0.0..=1.0).contains(&alpha) => {
                Err(invalid(format!("alpha {alpha} must be within (0, 1]")))
            }
            _ => Ok(()),
        }
    }

    fn calculate(&self, closes: &[f64]) -> Vec<Option<f64>> {
        match *self {
            IndicatorKind::ChangeInPrice => change::calculate_change_in_price(closes),
            IndicatorKind::Rsi { period, method } => rsi::calculate_rsi(closes, period, method),
            IndicatorKind::Sma { period } => sma::calculate_sma(closes, period),
            IndicatorKind::Ema { period, alpha } => {
                let alpha = if alpha == 0.0 {
                    ema::span_alpha(period)
                } else {
                    alpha
                };
                ema::calculate_ema(closes, alpha)
            }
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::ChangeInPrice => write!(f, "CHANGE_IN_PRICE"),
            IndicatorKind::Rsi { period, method } => write!(f, "RSI({},{})", period, method),
            IndicatorKind::Sma { period } => write!(f, "SMA({})", period),
            IndicatorKind::Ema { period, alpha } if *alpha == 0.0 => write!(f, "EMA({})", period),
            IndicatorKind::Ema { period, alpha } => write!(f, "EMA({},{})", period, alpha),
        }
    }
}

/// Applied indicators and the thresholds used to turn them into signals.
#[derive(Debug, Clone, Default)]
pub struct Indicators {
    current: BTreeMap<String, IndicatorKind>,
    signals: BTreeMap<String, SignalThreshold>,
}

impl Indicators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute `kind` on every symbol group and remember it for [`refresh`].
    ///
    /// [`refresh`]: Indicators::refresh
    pub fn apply(&mut self, frame: &mut StockFrame, kind: IndicatorKind) -> Result<(), AutotraderError> {
        kind.validate()?;
        compute(frame, &kind)?;
        debug!(indicator = %kind, "indicator applied");
        self.current.insert(kind.column().to_string(), kind);
        Ok(())
    }

    pub fn change_in_price(&mut self, frame: &mut StockFrame) -> Result<(), AutotraderError> {
        self.apply(frame, IndicatorKind::ChangeInPrice)
    }

    pub fn relative_strength_index(
        &mut self,
        frame: &mut StockFrame,
        period: usize,
        method: RsiMethod,
    ) -> Result<(), AutotraderError> {
        self.apply(frame, IndicatorKind::Rsi { period, method })
    }

    pub fn simple_moving_average(
        &mut self,
        frame: &mut StockFrame,
        period: usize,
    ) -> Result<(), AutotraderError> {
        self.apply(frame, IndicatorKind::Sma { period })
    }

    pub fn exponential_moving_average(
        &mut self,
        frame: &mut StockFrame,
        period: usize,
        alpha: f64,
    ) -> Result<(), AutotraderError> {
        self.apply(frame, IndicatorKind::Ema { period, alpha })
    }

    pub fn current_indicators(&self) -> &BTreeMap<String, IndicatorKind> {
        &self.current
    }

    /// Recompute every applied indicator, typically after `add_rows`.
    pub fn refresh(&self, frame: &mut StockFrame) -> Result<(), AutotraderError> {
        for kind in self.current.values() {
            compute(frame, kind)?;
        }
        Ok(())
    }

    pub fn set_indicator_signal(
        &mut self,
        indicator: &str,
        buy: f64,
        sell: f64,
        buy_operator: Comparison,
        sell_operator: Comparison,
    ) {
        self.signals.insert(
            indicator.to_string(),
            SignalThreshold {
                buy,
                sell,
                buy_operator,
                sell_operator,
            },
        );
    }

    /// The thresholds for `indicator`, or all of them when it is `None` or
    /// has none set.
    pub fn get_indicator_signal(&self, indicator: Option<&str>) -> BTreeMap<String, SignalThreshold> {
        match indicator.and_then(|name| self.signals.get_key_value(name)) {
            Some((name, threshold)) => BTreeMap::from([(name.clone(), *threshold)]),
            None => self.signals.clone(),
        }
    }

    pub fn check_signals(&self, frame: &StockFrame) -> Option<Vec<Signal>> {
        frame.check_signals(&self.signals)
    }
}

fn compute(frame: &mut StockFrame, kind: &IndicatorKind) -> Result<(), AutotraderError> {
    for symbol in frame.symbols() {
        let closes = frame
            .group(&symbol)
            .map(|g| g.closes())
            .unwrap_or_default();
        let values = kind.calculate(&closes);
        frame.set_column(kind.column(), &symbol, &values)?;
    }
    Ok(())
}
