//! Portfolio positions and asset classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AutotraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Equity,
    Etf,
    Forex,
    Future,
    Option,
    MutualFund,
    FixedIncome,
}

impl FromStr for AssetType {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "equity" | "stock" | "stocks" => Ok(AssetType::Equity),
            "etf" => Ok(AssetType::Etf),
            "forex" => Ok(AssetType::Forex),
            "future" | "futures" => Ok(AssetType::Future),
            "option" | "options" => Ok(AssetType::Option),
            "mutual_fund" => Ok(AssetType::MutualFund),
            "fixed_income" => Ok(AssetType::FixedIncome),
            other => Err(AutotraderError::invalid_order(format!(
                "unknown asset type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetType::Equity => "EQUITY",
            AssetType::Etf => "ETF",
            AssetType::Forex => "FOREX",
            AssetType::Future => "FUTURE",
            AssetType::Option => "OPTION",
            AssetType::MutualFund => "MUTUAL_FUND",
            AssetType::FixedIncome => "FIXED_INCOME",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub asset_type: AssetType,
    pub quantity: i64,
    pub purchase_price: f64,
    pub purchase_date: Option<NaiveDate>,
}

impl Position {
    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.purchase_price
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.purchase_price)
    }
}

/// Input for [`Portfolio::add_positions`]; omitted fields default to zero
/// quantity, zero price and no purchase date.
///
/// [`Portfolio::add_positions`]: crate::domain::portfolio::Portfolio::add_positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPosition {
    pub symbol: String,
    pub asset_type: AssetType,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
}

impl NewPosition {
    pub fn new(symbol: &str, asset_type: AssetType) -> Self {
        NewPosition {
            symbol: symbol.to_string(),
            asset_type,
            quantity: 0,
            purchase_price: 0.0,
            purchase_date: None,
        }
    }
}
