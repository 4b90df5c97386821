//! Broker order document: orders, legs, instruments and order responses.
//!
//! Field names serialize in camelCase and enum values in upper snake case,
//! matching the order payload accepted by the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AutotraderError;
use crate::domain::position::AssetType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
}

impl FromStr for OrderType {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mkt" | "market" => Ok(OrderType::Market),
            "lmt" | "limit" => Ok(OrderType::Limit),
            "stop" => Ok(OrderType::Stop),
            "stop_lmt" | "stop_limit" => Ok(OrderType::StopLimit),
            "trailing_stop" => Ok(OrderType::TrailingStop),
            other => Err(AutotraderError::invalid_order(format!(
                "unknown order type '{other}' (expected mkt, lmt, stop, stop_lmt or trailing_stop)"
            ))),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            OrderType::Market => "mkt",
            OrderType::Limit => "lmt",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_lmt",
            OrderType::TrailingStop => "trailing_stop",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl FromStr for Side {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            other => Err(AutotraderError::invalid_order(format!(
                "unknown side '{other}' (expected long or short)"
            ))),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnterExit {
    Enter,
    Exit,
}

impl EnterExit {
    pub fn opposite(&self) -> EnterExit {
        match self {
            EnterExit::Enter => EnterExit::Exit,
            EnterExit::Exit => EnterExit::Enter,
        }
    }
}

impl FromStr for EnterExit {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enter" => Ok(EnterExit::Enter),
            "exit" => Ok(EnterExit::Exit),
            other => Err(AutotraderError::invalid_order(format!(
                "unknown action '{other}' (expected enter or exit)"
            ))),
        }
    }
}

impl fmt::Display for EnterExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnterExit::Enter => f.write_str("enter"),
            EnterExit::Exit => f.write_str("exit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    Buy,
    Sell,
    SellShort,
    BuyToCover,
    SellToClose,
    BuyToOpen,
}

impl Instruction {
    /// | | long | short |
    /// |---|---|---|
    /// | enter | BUY | SELL_SHORT |
    /// | exit | SELL | BUY_TO_COVER |
    pub fn for_trade(enter_exit: EnterExit, side: Side) -> Instruction {
        match (enter_exit, side) {
            (EnterExit::Enter, Side::Long) => Instruction::Buy,
            (EnterExit::Enter, Side::Short) => Instruction::SellShort,
            (EnterExit::Exit, Side::Long) => Instruction::Sell,
            (EnterExit::Exit, Side::Short) => Instruction::BuyToCover,
        }
    }
}

impl FromStr for Instruction {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Instruction::Buy),
            "sell" => Ok(Instruction::Sell),
            "sell_short" => Ok(Instruction::SellShort),
            "buy_to_cover" => Ok(Instruction::BuyToCover),
            "sell_to_close" => Ok(Instruction::SellToClose),
            "buy_to_open" => Ok(Instruction::BuyToOpen),
            _ => Err(AutotraderError::invalid_order(
                "specified side is not valid, choose a valid side",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Session {
    /// Pre-market hours
    Am,
    /// Post-market hours
    Pm,
    Normal,
    /// Active regardless of the session
    Seamless,
}

impl FromStr for Session {
    type Err = AutotraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "am" => Ok(Session::Am),
            "pm" => Ok(Session::Pm),
            "normal" => Ok(Session::Normal),
            "seamless" => Ok(Session::Seamless),
            _ => Err(AutotraderError::invalid_order("invalid session type")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDuration {
    Day,
    GoodTillCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStrategyType {
    Single,
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopPriceLinkBasis {
    Last,
    Bid,
    Ask,
    Mark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopPriceLinkType {
    Value,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopType {
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    pub asset_type: AssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_asset_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLeg {
    pub instruction: Instruction,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<Instrument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_strategy_type: OrderStrategyType,
    pub order_type: OrderType,
    pub session: Session,
    pub duration: OrderDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price_link_basis: Option<StopPriceLinkBasis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price_link_type: Option<StopPriceLinkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_type: Option<StopType>,
    pub order_leg_collection: Vec<OrderLeg>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_order_strategies: Vec<Order>,
}

impl Order {
    /// A SINGLE, NORMAL-session, DAY order with no legs.
    pub fn single(order_type: OrderType) -> Self {
        Order {
            order_strategy_type: OrderStrategyType::Single,
            order_type,
            session: Session::Normal,
            duration: OrderDuration::Day,
            cancel_time: None,
            price: None,
            stop_price: None,
            stop_price_link_basis: None,
            stop_price_link_type: None,
            stop_price_offset: None,
            stop_type: None,
            order_leg_collection: Vec::new(),
            child_order_strategies: Vec::new(),
        }
    }

    /// The first leg's instrument, if one has been set.
    pub fn primary_instrument(&self) -> Option<&Instrument> {
        self.order_leg_collection
            .first()
            .and_then(|leg| leg.instrument.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Filled,
    Working,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub account: String,
    pub status: OrderStatus,
    pub symbol: String,
    pub instruction: Instruction,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_price: Option<f64>,
    pub entered_time: DateTime<Utc>,
    #[serde(default)]
    pub simulated: bool,
}
