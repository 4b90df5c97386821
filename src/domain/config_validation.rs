//! Configuration validation and the typed values read from each section.
//!
//! Validates all config fields before the robot runs.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Duration;

use crate::domain::error::AutotraderError;
use crate::domain::indicator::{IndicatorKind, RsiMethod};
use crate::domain::market_hours::{parse_time_of_day, MarketHours};
use crate::domain::price_bar::BarType;
use crate::domain::signal::{Comparison, SignalThreshold};
use crate::ports::config_port::ConfigPort;

/// Upper bound on `lookback_days` and on the span of one bar.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    validate_data(config)?;
    validate_robot(config)?;
    market_hours(config)?;
    indicator_kinds(config)?;
    signal_thresholds(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AutotraderError {
    AutotraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// `None` when the key is absent; an error when present but unparseable.
fn optional<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, AutotraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw.trim()))),
    }
}

fn positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, AutotraderError> {
    let value = optional::<i64>(config, section, key)?.unwrap_or(default);
    if value < 1 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(value)
}

/// Upper-cased, de-duplicated symbols from a comma-separated list.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(AutotraderError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_robot(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    let symbols = config
        .get_string("robot", "symbols")
        .map(|s| parse_symbols(&s))
        .unwrap_or_default();
    if symbols.is_empty() {
        return Err(AutotraderError::ConfigMissing {
            section: "robot".to_string(),
            key: "symbols".to_string(),
        });
    }
    let bar_size = positive(config, "robot", "bar_size", 1)?;
    let bar_size = u32::try_from(bar_size)
        .map_err(|_| invalid("robot", "bar_size", "bar_size is too large"))?;
    let bar_type = bar_type(config)?;
    if bar_type.duration(bar_size)? > Duration::days(MAX_LOOKBACK_DAYS) {
        return Err(invalid(
            "robot",
            "bar_size",
            format!("{bar_size} {bar_type} bars span more than {MAX_LOOKBACK_DAYS} days"),
        ));
    }
    let lookback_days = positive(config, "robot", "lookback_days", 1)?;
    if lookback_days > MAX_LOOKBACK_DAYS {
        return Err(invalid(
            "robot",
            "lookback_days",
            format!("lookback_days must be at most {MAX_LOOKBACK_DAYS}"),
        ));
    }
    positive(config, "robot", "quantity", 1)?;
    Ok(())
}

pub fn bar_type(config: &dyn ConfigPort) -> Result<BarType, AutotraderError> {
    match config.get_string("robot", "bar_type") {
        None => Ok(BarType::Minute),
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid("robot", "bar_type", format!("unknown bar type '{}'", raw.trim()))),
    }
}

/// `[market]` times, defaulting any key that is absent.
pub fn market_hours(config: &dyn ConfigPort) -> Result<MarketHours, AutotraderError> {
    let defaults = MarketHours::default();
    let time = |key: &str, default| match config.get_string("market", key) {
        Some(raw) => parse_time_of_day(key, &raw),
        None => Ok(default),
    };
    MarketHours::new(
        time("pre_open", defaults.pre_open)?,
        time("regular_open", defaults.regular_open)?,
        time("regular_close", defaults.regular_close)?,
        time("post_close", defaults.post_close)?,
    )
}

/// Indicators enabled in `[indicators]`. Each is on only when its
/// `<name>_period` key is present.
pub fn indicator_kinds(config: &dyn ConfigPort) -> Result<Vec<IndicatorKind>, AutotraderError> {
    let period = |key: &str| -> Result<Option<usize>, AutotraderError> {
        match optional::<i64>(config, "indicators", key)? {
            None => Ok(None),
            Some(p) if p >= 1 => Ok(Some(p as usize)),
            Some(_) => Err(invalid("indicators", key, format!("{key} must be at least 1"))),
        }
    };

    let mut kinds = Vec::new();
    if let Some(period) = period("rsi_period")? {
        let method = match config.get_string("indicators", "rsi_method") {
            Some(raw) => raw.parse::<RsiMethod>()?,
            None => RsiMethod::default(),
        };
        kinds.push(IndicatorKind::Rsi { period, method });
    }
    if let Some(period) = period("sma_period")? {
        kinds.push(IndicatorKind::Sma { period });
    }
    if let Some(period) = period("ema_period")? {
        let alpha = optional::<f64>(config, "indicators", "ema_alpha")?.unwrap_or(0.0);
        kinds.push(IndicatorKind::Ema { period, alpha });
    }
    for kind in &kinds {
        kind.validate()?;
    }
    Ok(kinds)
}

/// Thresholds from `[signals]`: `<col>_buy`, `<col>_buy_operator`,
/// `<col>_sell`, `<col>_sell_operator`. A column needs all four keys.
pub fn signal_thresholds(
    config: &dyn ConfigPort,
) -> Result<BTreeMap<String, SignalThreshold>, AutotraderError> {
    let mut columns: Vec<String> = Vec::new();
    for key in config.keys("signals") {
        let column = ["_buy_operator", "_sell_operator", "_buy", "_sell"]
            .iter()
            .find_map(|suffix| key.strip_suffix(suffix))
            .filter(|column| !column.is_empty())
            .ok_or_else(|| {
                invalid(
                    "signals",
                    &key,
                    "expected <column>_buy, <column>_sell or their _operator keys",
                )
            })?;
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }

    let mut thresholds = BTreeMap::new();
    for column in columns {
        let required = |suffix: &str| -> Result<String, AutotraderError> {
            let key = format!("{column}_{suffix}");
            config
                .get_string("signals", &key)
                .ok_or(AutotraderError::ConfigMissing {
                    section: "signals".to_string(),
                    key,
                })
        };
        let level = |suffix: &str| -> Result<f64, AutotraderError> {
            let raw = required(suffix)?;
            raw.trim().parse().map_err(|_| {
                invalid(
                    "signals",
                    &format!("{column}_{suffix}"),
                    format!("cannot parse '{}' as a number", raw.trim()),
                )
            })
        };
        let operator = |suffix: &str| -> Result<Comparison, AutotraderError> {
            required(suffix)?.parse::<Comparison>().map_err(|e| match e {
                AutotraderError::ConfigInvalid { reason, .. } => {
                    invalid("signals", &format!("{column}_{suffix}"), reason)
                }
                other => other,
            })
        };
        let threshold = SignalThreshold {
            buy: level("buy")?,
            sell: level("sell")?,
            buy_operator: operator("buy_operator")?,
            sell_operator: operator("sell_operator")?,
        };
        thresholds.insert(column, threshold);
    }
    Ok(thresholds)
}
