//! Price bar and quote representation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AutotraderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// Build a bar from an epoch-milliseconds timestamp, the wire format of
    /// the historical price endpoint.
    #[allow(clippy::too_many_arguments)]
    pub fn from_epoch_millis(
        symbol: &str,
        millis: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Result<Self, AutotraderError> {
        Ok(PriceBar {
            symbol: symbol.to_string(),
            datetime: datetime_from_millis(millis)?,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn epoch_millis(&self) -> i64 {
        self.datetime.timestamp_millis()
    }
}

pub fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>, AutotraderError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AutotraderError::data(format!("timestamp out of range: {millis}")))
}

/// Latest price snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Quote {
    pub fn to_bar(&self) -> PriceBar {
        PriceBar {
            symbol: self.symbol.clone(),
            datetime: self.datetime,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

impl From<&PriceBar> for Quote {
    fn from(bar: &PriceBar) -> Self {
        Quote {
            symbol: bar.symbol.clone(),
            datetime: bar.datetime,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarType {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl BarType {
    /// Wall-clock length of `size` bars. Months count as 30 days. Spans
    /// beyond what a `Duration` holds are a `ConfigInvalid` on `bar_size`.
    pub fn duration(&self, size: u32) -> Result<Duration, AutotraderError> {
        let size = i64::from(size.max(1));
        let span = match self {
            BarType::Minute => Duration::try_minutes(size),
            BarType::Hour => Duration::try_hours(size),
            BarType::Day => Duration::try_days(size),
            BarType::Week => Duration::try_days(7 * size),
            BarType::Month => Duration::try_days(30 * size),
        };
        span.ok_or_else(|| AutotraderError::ConfigInvalid {
            section: "robot".into(),
            key: "bar_size".into(),
            reason: format!("{size} {self} bars are too long"),
        })
    }
}

impl FromStr for BarType {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "min" | "m" => Ok(BarType::Minute),
            "hour" | "h" => Ok(BarType::Hour),
            "day" | "daily" | "d" => Ok(BarType::Day),
            "week" | "weekly" | "w" => Ok(BarType::Week),
            "month" | "monthly" => Ok(BarType::Month),
            other => Err(AutotraderError::data(format!("unknown bar type '{other}'"))),
        }
    }
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarType::Minute => "minute",
            BarType::Hour => "hour",
            BarType::Day => "day",
            BarType::Week => "week",
            BarType::Month => "month",
        };
        write!(f, "{name}")
    }
}
