//! Trading session windows, expressed as UTC times of day.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use std::fmt;

use super::error::AutotraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSession {
    PreMarket,
    Regular,
    PostMarket,
    Closed,
}

impl fmt::Display for MarketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketSession::PreMarket => "pre-market",
            MarketSession::Regular => "regular",
            MarketSession::PostMarket => "post-market",
            MarketSession::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Each window is half-open: pre `[pre_open, regular_open)`, regular
/// `[regular_open, regular_close)`, post `[regular_close, post_close)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    pub pre_open: NaiveTime,
    pub regular_open: NaiveTime,
    pub regular_close: NaiveTime,
    pub post_close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        MarketHours {
            pre_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            regular_open: NaiveTime::from_hms_opt(14, 30, 0).unwrap_or(NaiveTime::MIN),
            regular_close: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            post_close: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Parses `HH:MM` (or `HH:MM:SS`) for the `[market]` section.
pub fn parse_time_of_day(key: &str, value: &str) -> Result<NaiveTime, AutotraderError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AutotraderError::ConfigInvalid {
            section: "market".into(),
            key: key.into(),
            reason: format!("invalid time '{value}' (expected HH:MM)"),
        })
}

impl MarketHours {
    pub fn new(
        pre_open: NaiveTime,
        regular_open: NaiveTime,
        regular_close: NaiveTime,
        post_close: NaiveTime,
    ) -> Result<Self, AutotraderError> {
        if !(pre_open <= regular_open && regular_open < regular_close && regular_close <= post_close)
        {
            return Err(AutotraderError::ConfigInvalid {
                section: "market".into(),
                key: "regular_open".into(),
                reason: format!(
                    "times must satisfy pre_open <= regular_open < regular_close <= post_close, \
                     got {pre_open} / {regular_open} / {regular_close} / {post_close}"
                ),
            });
        }
        Ok(MarketHours {
            pre_open,
            regular_open,
            regular_close,
            post_close,
        })
    }

    fn is_weekend(now: DateTime<Utc>) -> bool {
        matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn session_at(&self, now: DateTime<Utc>) -> MarketSession {
        if Self::is_weekend(now) {
            return MarketSession::Closed;
        }
        let t = now.time();
        if t >= self.pre_open && t < self.regular_open {
            MarketSession::PreMarket
        } else if t >= self.regular_open && t < self.regular_close {
            MarketSession::Regular
        } else if t >= self.regular_close && t < self.post_close {
            MarketSession::PostMarket
        } else {
            MarketSession::Closed
        }
    }

    pub fn pre_market_open(&self, now: DateTime<Utc>) -> bool {
        self.session_at(now) == MarketSession::PreMarket
    }

    pub fn regular_market_open(&self, now: DateTime<Utc>) -> bool {
        self.session_at(now) == MarketSession::Regular
    }

    pub fn post_market_open(&self, now: DateTime<Utc>) -> bool {
        self.session_at(now) == MarketSession::PostMarket
    }
}
